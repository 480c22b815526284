//! Template resolution errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("missing template key: {0}")]
    MissingKey(String),
    #[error("attribute not resolvable in plain formatting: {0}")]
    Attribute(String),
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("invalid format spec '{spec}' for {value}")]
    InvalidFormatSpec { spec: String, value: String },
    #[error("expression contains disallowed operations: {0}")]
    Disallowed(String),
    #[error("evaluation error: {0}")]
    Eval(String),
    #[error("type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },
    #[error("undefined variable: {0}")]
    Undefined(String),
}

pub type Result<T> = std::result::Result<T, TemplateError>;
