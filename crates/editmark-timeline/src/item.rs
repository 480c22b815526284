//! Track items, their source clips and the capability view the publish
//! layer reads them through.

use std::collections::BTreeMap;

use editmark_core::{FrameRange, FrameRate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tag::Tag;
use crate::track::{default_true, Track, TrackKind};

/// Picture format of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Format {
    pub width: u32,
    pub height: u32,
    pub pixel_aspect: f64,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            pixel_aspect: 1.0,
        }
    }
}

/// Media behind a source clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    /// File path of the first file, `plate.%04d.exr` style for sequences
    pub path: String,
    /// First frame number on disk
    #[serde(default)]
    pub start_frame: i64,
    /// Start timecode in frames
    #[serde(default)]
    pub timecode_start: i64,
    /// Length in frames
    pub duration: i64,
    /// Frame number padding for sequences
    #[serde(default)]
    pub padding: usize,
    /// File name before the frame number
    #[serde(default)]
    pub filename_head: String,
    /// False for image sequences
    #[serde(default = "default_true")]
    pub single_file: bool,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default = "default_pixel_aspect")]
    pub pixel_aspect: f64,
    #[serde(default)]
    pub has_audio: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_pixel_aspect() -> f64 {
    1.0
}

impl MediaSource {
    /// A single movie file.
    pub fn movie(path: impl Into<String>, duration: i64) -> Self {
        Self {
            path: path.into(),
            start_frame: 0,
            timecode_start: 0,
            duration,
            padding: 0,
            filename_head: String::new(),
            single_file: true,
            width: 1920,
            height: 1080,
            pixel_aspect: 1.0,
            has_audio: false,
            metadata: BTreeMap::new(),
        }
    }

    /// An image sequence.
    pub fn sequence(
        path: impl Into<String>,
        filename_head: impl Into<String>,
        start_frame: i64,
        duration: i64,
        padding: usize,
    ) -> Self {
        Self {
            start_frame,
            timecode_start: start_frame,
            padding,
            filename_head: filename_head.into(),
            single_file: false,
            ..Self::movie(path, duration)
        }
    }

    pub fn is_sequence(&self) -> bool {
        !self.single_file
    }
}

/// Project bin clip a track item plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceClip {
    pub name: String,
    pub media: MediaSource,
    /// Clip rate, when the host reports one
    #[serde(default)]
    pub framerate: Option<FrameRate>,
    /// Source media colour transform
    #[serde(default)]
    pub colorspace: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl SourceClip {
    pub fn new(name: impl Into<String>, media: MediaSource) -> Self {
        Self {
            name: name.into(),
            media,
            framerate: None,
            colorspace: String::new(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

/// A clip placed on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackItem {
    /// Stable host GUID
    pub guid: String,
    pub name: String,
    /// Edit event number
    #[serde(default)]
    pub event_number: u32,
    /// First timeline frame (inclusive)
    pub timeline_in: i64,
    /// Last timeline frame (inclusive)
    pub timeline_out: i64,
    #[serde(default)]
    pub source_in: f64,
    #[serde(default)]
    pub source_out: f64,
    /// Playback speed (1.0 = normal, 0.0 = freeze, negative = reversed)
    #[serde(default = "default_speed")]
    pub playback_speed: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub framerate: Option<FrameRate>,
    pub source: SourceClip,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

fn default_speed() -> f64 {
    1.0
}

impl TrackItem {
    /// Create an item spanning `timeline_in..=timeline_out` backed by a
    /// movie of the same length.
    pub fn new(name: impl Into<String>, timeline_in: i64, timeline_out: i64) -> Self {
        let name = name.into();
        let duration = timeline_out - timeline_in + 1;
        let media = MediaSource::movie(format!("/media/{}.mov", name), duration);
        Self {
            guid: Uuid::new_v4().to_string(),
            source: SourceClip::new(name.clone(), media),
            name,
            event_number: 0,
            timeline_in,
            timeline_out,
            source_in: 0.0,
            source_out: (duration - 1) as f64,
            playback_speed: 1.0,
            enabled: true,
            framerate: None,
            tags: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: SourceClip) -> Self {
        self.source = source;
        self
    }

    pub fn with_source_range(mut self, source_in: f64, source_out: f64) -> Self {
        self.source_in = source_in;
        self.source_out = source_out;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.playback_speed = speed;
        self
    }

    pub fn with_event_number(mut self, event_number: u32) -> Self {
        self.event_number = event_number;
        self
    }

    pub fn frame_range(&self) -> FrameRange {
        FrameRange::new(self.timeline_in, self.timeline_out)
    }

    /// Timeline length in frames.
    pub fn duration(&self) -> i64 {
        self.frame_range().duration()
    }
}

/// Read access to a placed clip, independent of the host item kind.
pub trait TimelineItem {
    fn guid(&self) -> &str;
    fn name(&self) -> &str;
    fn event_number(&self) -> u32;
    fn timeline_in(&self) -> i64;
    fn timeline_out(&self) -> i64;
    fn source_in(&self) -> f64;
    fn source_out(&self) -> f64;
    fn playback_speed(&self) -> f64;
    fn is_enabled(&self) -> bool;
    fn parent_track(&self) -> &Track;
    fn tags(&self) -> &[Tag];
    fn source(&self) -> &SourceClip;
    fn framerate(&self) -> Option<FrameRate>;

    fn frame_range(&self) -> FrameRange {
        FrameRange::new(self.timeline_in(), self.timeline_out())
    }

    fn duration(&self) -> i64 {
        self.frame_range().duration()
    }
}

/// A track item together with the track it sits on, one variant per host
/// item kind.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Video { item: &'a TrackItem, track: &'a Track },
    Audio { item: &'a TrackItem, track: &'a Track },
}

impl<'a> ItemRef<'a> {
    /// Pair an item with its track.
    pub fn new(item: &'a TrackItem, track: &'a Track) -> Self {
        match track.kind {
            TrackKind::Video => ItemRef::Video { item, track },
            TrackKind::Audio => ItemRef::Audio { item, track },
        }
    }

    pub fn item(&self) -> &'a TrackItem {
        match self {
            ItemRef::Video { item, .. } | ItemRef::Audio { item, .. } => item,
        }
    }

    pub fn track(&self) -> &'a Track {
        match self {
            ItemRef::Video { track, .. } | ItemRef::Audio { track, .. } => track,
        }
    }

    pub fn kind(&self) -> TrackKind {
        match self {
            ItemRef::Video { .. } => TrackKind::Video,
            ItemRef::Audio { .. } => TrackKind::Audio,
        }
    }
}

impl TimelineItem for ItemRef<'_> {
    fn guid(&self) -> &str {
        &self.item().guid
    }

    fn name(&self) -> &str {
        &self.item().name
    }

    fn event_number(&self) -> u32 {
        self.item().event_number
    }

    fn timeline_in(&self) -> i64 {
        self.item().timeline_in
    }

    fn timeline_out(&self) -> i64 {
        self.item().timeline_out
    }

    fn source_in(&self) -> f64 {
        self.item().source_in
    }

    fn source_out(&self) -> f64 {
        self.item().source_out
    }

    fn playback_speed(&self) -> f64 {
        self.item().playback_speed
    }

    fn is_enabled(&self) -> bool {
        self.item().enabled
    }

    fn parent_track(&self) -> &Track {
        self.track()
    }

    fn tags(&self) -> &[Tag] {
        &self.item().tags
    }

    fn source(&self) -> &SourceClip {
        &self.item().source
    }

    fn framerate(&self) -> Option<FrameRate> {
        self.item().framerate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_ranges() {
        let item = TrackItem::new("shotA", 1000, 1100);
        assert_eq!(item.duration(), 101);
        assert_eq!(item.source_out, 100.0);
        assert_eq!(item.source.media.duration, 101);
        assert!(!item.guid.is_empty());
    }

    #[test]
    fn test_item_ref_variant_follows_track() {
        let mut video = Track::new_video("main", 1);
        video.add_item(TrackItem::new("a", 0, 10));
        let audio = Track::new_audio("A1", 0);
        let item = TrackItem::new("b", 0, 10);

        let v = ItemRef::new(&video.items[0], &video);
        assert!(matches!(v, ItemRef::Video { .. }));
        assert_eq!(v.parent_track().name, "main");
        assert_eq!(v.frame_range(), FrameRange::new(0, 10));

        let a = ItemRef::new(&item, &audio);
        assert_eq!(a.kind(), TrackKind::Audio);
        assert_eq!(a.name(), "b");
    }

    #[test]
    fn test_image_sequence_source() {
        let media = MediaSource::sequence("/plates/plate.%04d.exr", "plate.", 1001, 50, 4);
        assert!(media.is_sequence());
        assert_eq!(media.timecode_start, 1001);
        assert_eq!(media.padding, 4);
    }
}
