//! Discovery error types

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery service is closed")]
    Closed,

    #[error("invalid service name '{0}'")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
