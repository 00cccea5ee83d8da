//! Drives a [`RegisteredServer`] through its lifecycle and keeps its
//! discovery announcement in step with it

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use fabric_common::Configuration;
use fabric_discovery::{Announcement, DiscoveryService, Registration};

use crate::error::Result;
use crate::transport::RegisteredServer;

pub struct ServerRunner {
    server: Arc<dyn RegisteredServer>,
    discovery: DiscoveryService,
    registration: Mutex<Option<Registration>>,
}

impl ServerRunner {
    pub fn new(server: Arc<dyn RegisteredServer>, discovery: DiscoveryService) -> Self {
        Self {
            server,
            discovery,
            registration: Mutex::new(None),
        }
    }

    pub fn server(&self) -> &Arc<dyn RegisteredServer> {
        &self.server
    }

    /// Configure, announce, then start the server.
    ///
    /// Returns the announcement; on any failure the announcement is withdrawn
    /// and the server stopped before the error is returned.
    pub async fn start(&self, configuration: &Configuration) -> Result<Announcement> {
        let binding = self.server.configure(configuration).await?;
        let announcement = Announcement::new(
            self.server.service_name(),
            &configuration.executor_announce_address(),
            binding.port,
            binding.payload,
        );

        let registration = match self
            .discovery
            .register(&announcement.service_name, announcement.endpoint())
        {
            Ok(registration) => registration,
            Err(e) => {
                self.server.stop().await;
                return Err(e.into());
            }
        };

        if let Err(e) = self.server.start().await {
            registration.cancel();
            self.server.stop().await;
            return Err(e);
        }

        *self.registration.lock() = Some(registration);
        info!(
            service = %announcement.service_name,
            host = %announcement.host,
            port = announcement.port,
            "Server announced and started"
        );
        Ok(announcement)
    }

    /// Withdraw the announcement, then stop the server. Idempotent.
    pub async fn stop(&self) {
        let registration = self.registration.lock().take();
        if let Some(registration) = registration {
            registration.cancel();
        }
        self.server.stop().await;
    }

    pub fn probe(&self) -> bool {
        let serving = self.server.probe();
        if !serving && self.registration.lock().is_some() {
            warn!(service = %self.server.service_name(), "Announced server is not serving");
        }
        serving
    }
}
