//! Server error types

use fabric_common::FabricError;
use fabric_discovery::DiscoveryError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server '{0}' is not configured")]
    NotConfigured(String),

    #[error("server '{0}' is already running")]
    AlreadyRunning(String),

    #[error("server '{name}' failed to start: {message}")]
    Start { name: String, message: String },

    #[error("deployment rejected: {0}")]
    InvalidDeployment(String),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Config(#[from] FabricError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
