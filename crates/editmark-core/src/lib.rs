//! EditMark Core - Foundation types for the editorial bridge
//!
//! This crate provides the fundamental types used throughout EditMark:
//! - Frame rates with exact integer detection and interchange rounding
//! - Inclusive frame ranges and the overlap engine used by vertical sync
//!   and effect assignment
//! - The shared error type

pub mod error;
pub mod overlap;
pub mod time;

pub use error::{EditMarkError, Result};
pub use overlap::{effect_overlaps, is_overlapping, Overlap};
pub use time::{FrameRange, FrameRate};
