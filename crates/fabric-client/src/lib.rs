//! Fabric Client - Remote dataset management
//!
//! This crate provides:
//! - `DatasetServiceClient`: resolves the dataset executor service through
//!   discovery and issues administrative calls over HTTP
//! - `RemoteDatasetFramework`: the management facade applications use, with
//!   namespacing and direct transaction-aware dataset handles

pub mod error;
pub mod framework;
pub mod remote;

pub use error::{ClientError, Result};
pub use framework::RemoteDatasetFramework;
pub use remote::DatasetServiceClient;
