//! Live view of one service's endpoints
//!
//! A [`ServiceDiscovered`] is handed out by the registry and tracks the current
//! endpoint set of a single service name. It does not own the set: the registry
//! replaces it wholesale on every registration change and every holder sees the
//! new value on its next read.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{DiscoveryError, Result};
use crate::model::ServiceEndpoint;

pub(crate) type EndpointSet = Arc<Vec<ServiceEndpoint>>;

#[derive(Clone, Debug)]
pub struct ServiceDiscovered {
    name: String,
    receiver: watch::Receiver<EndpointSet>,
}

impl ServiceDiscovered {
    pub(crate) fn new(name: &str, receiver: watch::Receiver<EndpointSet>) -> Self {
        Self {
            name: name.to_string(),
            receiver,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current endpoint set
    pub fn endpoints(&self) -> Arc<Vec<ServiceEndpoint>> {
        self.receiver.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.borrow().len()
    }

    pub fn contains(&self, endpoint: &ServiceEndpoint) -> bool {
        self.receiver.borrow().contains(endpoint)
    }

    /// A fresh receiver for change notifications, independent of this handle
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<ServiceEndpoint>>> {
        self.receiver.clone()
    }

    /// Wait until the endpoint set differs from the one last observed here.
    ///
    /// Fails with [`DiscoveryError::Closed`] once the registry has been closed.
    pub async fn changed(&mut self) -> Result<Arc<Vec<ServiceEndpoint>>> {
        self.receiver
            .changed()
            .await
            .map_err(|_| DiscoveryError::Closed)?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}
