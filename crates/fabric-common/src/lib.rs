//! Fabric Common - Shared types, configuration, and utilities
//!
//! This crate provides the foundational pieces used across all fabric components:
//! - Error types and error codes
//! - The configuration object consumed by servers and clients
//! - Dataset namespacing
//! - Utility functions

pub mod config;
pub mod error;
pub mod namespace;
pub mod utils;

// Re-exports for convenience
pub use config::Configuration;
pub use error::{ErrorCode, FabricError};
pub use namespace::DatasetNamespace;
pub use utils::{is_valid_name, local_ip};

/// Version prefix of every HTTP route served by the data fabric
pub const API_VERSION: &str = "v2";

/// Discovery name of the dataset operation executor service
pub const DATASET_EXECUTOR_SERVICE: &str = "dataset.executor";

/// Namespace applied to user datasets when none is configured
pub const DEFAULT_NAMESPACE: &str = "user";
