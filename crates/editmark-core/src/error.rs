//! Error types for EditMark.

use thiserror::Error;

/// Main error type for EditMark host-model operations.
#[derive(Error, Debug)]
pub enum EditMarkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Timeline error: {0}")]
    Timeline(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for EditMark operations.
pub type Result<T> = std::result::Result<T, EditMarkError>;
