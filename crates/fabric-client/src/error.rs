//! Client error types

use fabric_common::FabricError;
use fabric_dataset::DatasetError;

/// Error type for remote dataset operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("service '{0}' unavailable")]
    ServiceUnavailable(String),

    #[error("dataset instance '{0}' not found")]
    InstanceNotFound(String),

    #[error("dataset instance '{0}' already exists")]
    InstanceAlreadyExists(String),

    #[error("bad request: code={code}, message={message}")]
    BadRequest { code: i32, message: String },

    #[error("server returned error: status={status}, message={message}")]
    ServerError { status: u16, message: String },

    #[error("invalid endpoint {address}: {message}")]
    InvalidEndpoint { address: String, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] FabricError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
