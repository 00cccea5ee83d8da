//! Endpoint selection strategies
//!
//! A strategy turns the live endpoint set of one service into a single target.
//! [`RandomEndpointStrategy`] spreads load uniformly over whatever is registered
//! right now; [`TimeLimitEndpointStrategy`] waits a bounded time for a service
//! that has not come up yet.

use std::time::Duration;

use rand::seq::IndexedRandom;
use tokio::time::Instant;
use tracing::debug;

use crate::discovered::ServiceDiscovered;
use crate::model::ServiceEndpoint;

/// Picks one endpoint out of a discovered service
pub trait EndpointStrategy: Send + Sync {
    /// One endpoint, or `None` when nothing is registered
    fn pick(&self) -> Option<ServiceEndpoint>;

    /// The set this strategy draws from
    fn discovered(&self) -> &ServiceDiscovered;
}

/// Uniform random choice over the current endpoint set
#[derive(Clone, Debug)]
pub struct RandomEndpointStrategy {
    discovered: ServiceDiscovered,
}

impl RandomEndpointStrategy {
    pub fn new(discovered: ServiceDiscovered) -> Self {
        Self { discovered }
    }
}

impl EndpointStrategy for RandomEndpointStrategy {
    fn pick(&self) -> Option<ServiceEndpoint> {
        let endpoints = self.discovered.endpoints();
        endpoints.choose(&mut rand::rng()).cloned()
    }

    fn discovered(&self) -> &ServiceDiscovered {
        &self.discovered
    }
}

/// Waits up to a time budget for the delegate strategy to yield an endpoint.
///
/// The wait suspends on registry change notifications; it never polls.
#[derive(Clone, Debug)]
pub struct TimeLimitEndpointStrategy<S> {
    delegate: S,
    timeout: Duration,
}

impl<S: EndpointStrategy> TimeLimitEndpointStrategy<S> {
    pub fn new(delegate: S, timeout: Duration) -> Self {
        Self { delegate, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Pick within the default budget
    pub async fn pick(&self) -> Option<ServiceEndpoint> {
        self.pick_within(self.timeout).await
    }

    /// Pick within an explicit budget.
    ///
    /// Returns `None` once `timeout` elapses with the set still empty, or as
    /// soon as the registry is closed.
    pub async fn pick_within(&self, timeout: Duration) -> Option<ServiceEndpoint> {
        let deadline = Instant::now() + timeout;

        // Subscribe before the first attempt so a registration landing between
        // the attempt and the wait still wakes us.
        let mut changes = self.delegate.discovered().subscribe();
        changes.borrow_and_update();

        if let Some(endpoint) = self.delegate.pick() {
            return Some(endpoint);
        }

        loop {
            match tokio::time::timeout_at(deadline, changes.changed()).await {
                Ok(Ok(())) => {
                    changes.borrow_and_update();
                    if let Some(endpoint) = self.delegate.pick() {
                        return Some(endpoint);
                    }
                }
                Ok(Err(_)) => {
                    debug!(
                        service = %self.delegate.discovered().name(),
                        "Registry closed while waiting for an endpoint"
                    );
                    return None;
                }
                Err(_) => {
                    debug!(
                        service = %self.delegate.discovered().name(),
                        timeout_ms = timeout.as_millis() as u64,
                        "No endpoint available within timeout"
                    );
                    return None;
                }
            }
        }
    }
}
