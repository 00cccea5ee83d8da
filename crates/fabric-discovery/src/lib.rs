//! Fabric Discovery - Service registry and endpoint selection
//!
//! This crate provides:
//! - An in-process service registry with push updates to watchers
//! - Cancellable registrations, withdrawn on cancel or on drop
//! - Endpoint selection strategies, including a time-bounded wait for a
//!   service to appear

pub mod discovered;
pub mod error;
pub mod model;
pub mod registry;
pub mod strategy;

// Re-export commonly used types
pub use discovered::ServiceDiscovered;
pub use error::DiscoveryError;
pub use model::{Announcement, ServiceEndpoint, ServicePayload};
pub use registry::{DiscoveryService, Registration};
pub use strategy::{EndpointStrategy, RandomEndpointStrategy, TimeLimitEndpointStrategy};
