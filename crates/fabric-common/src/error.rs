//! Error types and error codes for the data fabric
//!
//! This module defines:
//! - `FabricError`: cross-cutting error enum
//! - `ErrorCode`: structured error codes carried in HTTP error bodies

use serde::{Deserialize, Serialize};

/// Cross-cutting error types
#[derive(thiserror::Error, Debug)]
pub enum FabricError {
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for FabricError {
    fn from(value: config::ConfigError) -> Self {
        FabricError::ConfigError(value.to_string())
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const UNKNOWN_ADMIN_OP: ErrorCode<'static> = ErrorCode {
    code: 24000,
    message: "unknown admin operation",
};

pub const DATASET_TYPE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 24001,
    message: "dataset type not found",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};
