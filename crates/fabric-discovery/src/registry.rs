//! In-process service registry
//!
//! Keeps the live endpoints of every logical service name and pushes each
//! change to the [`ServiceDiscovered`] handles watching that name. The registry
//! is an explicit object: create it at startup, share it by reference (it is
//! cheap to clone), and [`close`](DiscoveryService::close) it at shutdown.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, info};

use fabric_common::is_valid_name;

use crate::discovered::{EndpointSet, ServiceDiscovered};
use crate::error::{DiscoveryError, Result};
use crate::model::ServiceEndpoint;

/// Endpoints of one service plus the channel that publishes them
struct ServiceEntry {
    /// Key: registration id, in registration order
    endpoints: BTreeMap<u64, ServiceEndpoint>,
    sender: watch::Sender<EndpointSet>,
}

impl ServiceEntry {
    fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            endpoints: BTreeMap::new(),
            sender,
        }
    }

    fn publish(&self) {
        let snapshot: Vec<ServiceEndpoint> = self.endpoints.values().cloned().collect();
        self.sender.send_replace(Arc::new(snapshot));
    }
}

struct RegistryInner {
    /// Key: service name
    services: DashMap<String, ServiceEntry>,
    next_registration_id: AtomicU64,
    closed: AtomicBool,
}

impl RegistryInner {
    fn remove_registration(&self, name: &str, id: u64) -> Option<ServiceEndpoint> {
        let mut entry = self.services.get_mut(name)?;
        let removed = entry.endpoints.remove(&id);
        if removed.is_some() {
            entry.publish();
        }
        removed
    }
}

/// Service registry shared by servers (which announce) and clients (which discover)
#[derive(Clone)]
pub struct DiscoveryService {
    inner: Arc<RegistryInner>,
}

impl DiscoveryService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                services: DashMap::new(),
                next_registration_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register an endpoint under a service name.
    ///
    /// The endpoint stays live until the returned [`Registration`] is cancelled
    /// or dropped.
    pub fn register(&self, name: &str, endpoint: ServiceEndpoint) -> Result<Registration> {
        if !is_valid_name(name) {
            return Err(DiscoveryError::InvalidName(name.to_string()));
        }
        if self.is_closed() {
            return Err(DiscoveryError::Closed);
        }

        let id = self
            .inner
            .next_registration_id
            .fetch_add(1, Ordering::Relaxed);
        {
            let mut entry = self
                .inner
                .services
                .entry(name.to_string())
                .or_insert_with(ServiceEntry::new);
            entry.endpoints.insert(id, endpoint.clone());
            entry.publish();
        }

        // close() may have swept the map between the check above and the insert
        if self.is_closed() {
            self.inner.remove_registration(name, id);
            return Err(DiscoveryError::Closed);
        }

        debug!(service = %name, endpoint = %endpoint, "Registered endpoint");

        Ok(Registration {
            registry: Arc::downgrade(&self.inner),
            name: name.to_string(),
            id,
            endpoint,
            cancelled: AtomicBool::new(false),
        })
    }

    /// Remove every registration of `endpoint` under `name`.
    ///
    /// Returns whether anything was removed.
    pub fn deregister(&self, name: &str, endpoint: &ServiceEndpoint) -> bool {
        let Some(mut entry) = self.inner.services.get_mut(name) else {
            return false;
        };
        let before = entry.endpoints.len();
        entry.endpoints.retain(|_, registered| registered != endpoint);
        let removed = entry.endpoints.len() != before;
        if removed {
            entry.publish();
            debug!(service = %name, endpoint = %endpoint, "Deregistered endpoint");
        }
        removed
    }

    /// Live view of the endpoints registered under `name`.
    ///
    /// Names nobody has registered yet yield an empty set that fills in as
    /// soon as a registration arrives.
    pub fn discover(&self, name: &str) -> ServiceDiscovered {
        if self.is_closed() {
            let (sender, receiver) = watch::channel(Arc::new(Vec::new()));
            drop(sender);
            return ServiceDiscovered::new(name, receiver);
        }

        let receiver = self
            .inner
            .services
            .entry(name.to_string())
            .or_insert_with(ServiceEntry::new)
            .sender
            .subscribe();

        // close() may have swept the map before the insert; dropping the
        // entry's sender closes the watch
        if self.is_closed() {
            self.inner.services.remove(name);
        }
        ServiceDiscovered::new(name, receiver)
    }

    /// Names that currently have at least one live endpoint
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .services
            .iter()
            .filter(|entry| !entry.endpoints.is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Withdraw every endpoint and close all watches.
    ///
    /// Idempotent. Watchers observe one final empty set followed by closure.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for mut entry in self.inner.services.iter_mut() {
            entry.endpoints.clear();
            entry.publish();
        }
        self.inner.services.clear();
        info!("Discovery service closed");
    }
}

impl Default for DiscoveryService {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one live registration.
///
/// Dropping the handle without calling [`cancel`](Registration::cancel) is
/// treated as loss of the registering session and withdraws the endpoint too.
pub struct Registration {
    registry: Weak<RegistryInner>,
    name: String,
    id: u64,
    endpoint: ServiceEndpoint,
    cancelled: AtomicBool,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// Withdraw the endpoint. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade()
            && registry.remove_registration(&self.name, self.id).is_some()
        {
            debug!(service = %self.name, endpoint = %self.endpoint, "Registration cancelled");
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.cancelled.load(Ordering::Acquire) {
            debug!(service = %self.name, endpoint = %self.endpoint, "Registration dropped, withdrawing endpoint");
            self.cancel();
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
