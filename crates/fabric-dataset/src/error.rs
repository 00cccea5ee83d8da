//! Dataset error types

use fabric_common::error;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("dataset instance '{0}' not found")]
    NotFound(String),

    #[error("dataset instance '{0}' already exists")]
    AlreadyExists(String),

    #[error("dataset type '{0}' is not registered")]
    UnknownType(String),

    #[error("invalid dataset instance name '{0}'")]
    InvalidName(String),

    #[error("invalid properties for '{name}': {message}")]
    InvalidProperties { name: String, message: String },

    #[error("dataset '{0}' used outside of a transaction")]
    NoTransaction(String),

    #[error("dataset '{0}' dropped")]
    Dropped(String),
}

impl DatasetError {
    /// Error code reported alongside this error in HTTP bodies
    pub fn error_code(&self) -> i32 {
        match self {
            DatasetError::NotFound(_) => error::RESOURCE_NOT_FOUND.code,
            DatasetError::AlreadyExists(_) => error::RESOURCE_CONFLICT.code,
            DatasetError::UnknownType(_) => error::DATASET_TYPE_NOT_FOUND.code,
            DatasetError::InvalidName(_) | DatasetError::InvalidProperties { .. } => {
                error::PARAMETER_VALIDATE_ERROR.code
            }
            DatasetError::NoTransaction(_) | DatasetError::Dropped(_) => error::SERVER_ERROR.code,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DatasetError::NotFound("fabric.user.bob".to_string()).to_string(),
            "dataset instance 'fabric.user.bob' not found"
        );
        assert_eq!(
            DatasetError::Dropped("t".to_string()).to_string(),
            "dataset 't' dropped"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(DatasetError::NotFound("a".into()).error_code(), 20004);
        assert_eq!(DatasetError::AlreadyExists("a".into()).error_code(), 20005);
        assert_eq!(DatasetError::UnknownType("x".into()).error_code(), 24001);
    }
}
