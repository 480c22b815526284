//! Error types for instance creation and collection.

use editmark_core::{EditMarkError, FrameRange};
use editmark_template::TemplateError;
use thiserror::Error;

/// Errors raised while converting clips and managing instances.
#[derive(Error, Debug)]
pub enum PublishError {
    /// User-facing creator error, shown verbatim.
    #[error("{0}")]
    Creator(String),

    #[error("Missing folder type for `{0}`")]
    MissingFolderType(String),

    #[error("No hero clip found for `{clip}` at {range}")]
    MissingHero { clip: String, range: FrameRange },

    #[error("Instance `{0}` has no parent shot instance in the collected set")]
    MissingParent(String),

    #[error("Legacy tag migration failed: {0}")]
    Legacy(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Core(#[from] EditMarkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for publish operations.
pub type Result<T> = std::result::Result<T, PublishError>;

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        PublishError::Serialization(e.to_string())
    }
}
