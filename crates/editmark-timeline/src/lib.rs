//! EditMark Timeline - host document model
//!
//! A serializable snapshot of the host editing application's document:
//! - Projects containing sequences
//! - Video and audio tracks holding track items and sub-track effects
//! - Tags attached to items, tracks and source clips, plus the tag store
//!   the publish layer persists its records through
//! - Project-level tags for records that belong to no item
//! - The track-item classifier used to pick clips for publishing

pub mod classifier;
pub mod item;
pub mod project;
pub mod serialization;
pub mod tag;
pub mod track;

pub use classifier::ItemFilter;
pub use item::{Format, ItemRef, MediaSource, SourceClip, TimelineItem, TrackItem};
pub use project::{Project, Sequence};
pub use serialization::ProjectFile;
pub use tag::{Tag, TagPayload, TagStore, AYON_TAG_NAME, AYON_WORKFILE_TAG_NAME, JSON_METADATA_KEY};
pub use track::{KeyFrame, Knob, SubTrackItem, Track, TrackKind};
