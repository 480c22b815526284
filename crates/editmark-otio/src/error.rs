//! Error types for interchange export.

use editmark_core::EditMarkError;
use thiserror::Error;

/// Errors raised while building or writing an interchange timeline.
#[derive(Error, Debug)]
pub enum OtioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid timecode `{0}`")]
    InvalidTimecode(String),

    #[error("Invalid frame rate: {0}")]
    InvalidRate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Timeline(#[from] EditMarkError),
}

/// Result type alias for interchange operations.
pub type Result<T> = std::result::Result<T, OtioError>;
