//! EditMark Template - naming templates for hierarchy paths, clip names and
//! product names.
//!
//! Templates use `{token}` placeholders with optional format specs
//! (`{_trackIndex_:0>3}`), `#`-run padding (`sh###`) and an extended mode
//! where `{{ expr }}` blocks are evaluated by a small allow-listed
//! interpreter.

pub mod builtins;
pub mod context;
pub mod engine;
pub mod error;
pub mod expression;
pub mod format;
pub mod padding;
pub mod value;

pub use context::FormatContext;
pub use engine::{extended_format, format_expression_string, resolve_template, validate_template};
pub use error::{Result, TemplateError};
pub use expression::Expression;
pub use format::format_template;
pub use padding::replace_hash_with_field;
pub use value::Value;
