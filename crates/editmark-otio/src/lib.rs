//! EditMark OTIO - interchange export of host sequences
//!
//! Builds OpenTimelineIO timelines from the host snapshot:
//! - Tracks with clips and explicit gaps
//! - Image-sequence or single-file media references
//! - Speed, freeze-frame and TimeWarp effects
//! - Markers from tags, including the data tag that links clips back to
//!   their publish instances

pub mod error;
pub mod export;
pub mod schema;
pub mod utils;

pub use error::{OtioError, Result};
pub use export::{
    get_marker_from_clip_index, marker_color, read_from_file, write_to_file, OtioExporter,
};
pub use schema::{
    Clip, Effect, Gap, MarkerColor, Marker, MediaReference, RationalTime, TimeRange, Timeline,
    Track, TrackChild, TrackKind,
};
