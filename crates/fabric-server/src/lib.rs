//! Fabric Server - Dataset operation executor service
//!
//! This crate provides:
//! - The HTTP transport exposing dataset admin operations
//! - The registered-server contract and the runner that announces servers
//! - Deployment assembly of a primary handler plus background workers
//! - Process startup: configuration, logging, shutdown

pub mod assembly;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod runner;
pub mod startup;
pub mod transport;
pub mod worker;

pub use assembly::{BackgroundWorker, Deployment, DeploymentSpecification, ServiceApplication};
pub use error::{Result, ServerError};
pub use runner::ServerRunner;
pub use transport::{DatasetOpExecutorService, RegisteredServer, ServerBinding};
pub use worker::StatsReporter;
