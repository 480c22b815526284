//! Interchange timeline object model.
//!
//! Every object serializes with its `OTIO_SCHEMA` tag so the written JSON
//! is readable by any OpenTimelineIO reader.

use std::collections::BTreeMap;
use std::ops::Add;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to every object.
pub type Metadata = Map<String, Value>;

/// Media reference key used by single-reference clips.
pub const DEFAULT_MEDIA_KEY: &str = "DEFAULT_MEDIA";

// ── Time ────────────────────────────────────────────────────────

/// A point in time as a value at a rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "RationalTime.1")]
pub struct RationalTime {
    pub rate: f64,
    pub value: f64,
}

impl RationalTime {
    pub fn new(value: f64, rate: f64) -> Self {
        Self { rate, value }
    }

    /// Same instant expressed at another rate, without rounding.
    pub fn rescaled_to(self, rate: f64) -> Self {
        if self.rate == rate || self.rate == 0.0 {
            return Self::new(self.value, rate);
        }
        Self::new(self.value * rate / self.rate, rate)
    }

    pub fn to_seconds(self) -> f64 {
        if self.rate == 0.0 {
            return 0.0;
        }
        self.value / self.rate
    }
}

impl Add for RationalTime {
    type Output = RationalTime;

    /// Sum at the higher of the two rates.
    fn add(self, other: RationalTime) -> RationalTime {
        if self.rate == other.rate {
            return RationalTime::new(self.value + other.value, self.rate);
        }
        let rate = self.rate.max(other.rate);
        RationalTime::new(
            self.rescaled_to(rate).value + other.rescaled_to(rate).value,
            rate,
        )
    }
}

/// A start time and a duration at the same rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "TimeRange.1")]
pub struct TimeRange {
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    pub fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// Range of `duration` frames starting at `start`.
    pub fn from_frames(start: f64, duration: f64, rate: f64) -> Self {
        Self::new(RationalTime::new(start, rate), RationalTime::new(duration, rate))
    }

    pub fn end_time_exclusive(&self) -> RationalTime {
        self.start_time + self.duration
    }
}

// ── Markers ─────────────────────────────────────────────────────

/// Marker colours known to interchange readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkerColor {
    Pink,
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Magenta,
    Black,
    White,
}

/// A named, coloured range annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "Marker.2")]
pub struct Marker {
    pub name: String,
    pub color: MarkerColor,
    pub marked_range: TimeRange,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub metadata: Metadata,
}

// ── Effects ─────────────────────────────────────────────────────

/// Effects attached to clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA")]
pub enum Effect {
    #[serde(rename = "LinearTimeWarp.1")]
    LinearTimeWarp(LinearTimeWarp),
    #[serde(rename = "FreezeFrame.1")]
    FreezeFrame(FreezeFrame),
    #[serde(rename = "TimeEffect.1")]
    TimeEffect(TimeEffect),
}

impl Effect {
    pub fn name(&self) -> &str {
        match self {
            Effect::LinearTimeWarp(e) => &e.name,
            Effect::FreezeFrame(e) => &e.name,
            Effect::TimeEffect(e) => &e.name,
        }
    }
}

/// Constant speed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearTimeWarp {
    pub name: String,
    pub effect_name: String,
    pub time_scalar: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl LinearTimeWarp {
    pub fn new(name: impl Into<String>, time_scalar: f64) -> Self {
        Self {
            name: name.into(),
            effect_name: "LinearTimeWarp".to_string(),
            time_scalar,
            metadata: Metadata::new(),
        }
    }
}

/// Hold of a single source frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeFrame {
    pub name: String,
    pub effect_name: String,
    pub time_scalar: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl FreezeFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effect_name: "FreezeFrame".to_string(),
            time_scalar: 0.0,
            metadata: Metadata::new(),
        }
    }
}

/// Host retime effect carried as metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEffect {
    pub name: String,
    pub effect_name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

// ── Media references ────────────────────────────────────────────

/// Where a clip's media lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA")]
pub enum MediaReference {
    #[serde(rename = "ExternalReference.1")]
    External(ExternalReference),
    #[serde(rename = "ImageSequenceReference.1")]
    ImageSequence(ImageSequenceReference),
    #[serde(rename = "MissingReference.1")]
    Missing(MissingReference),
}

impl MediaReference {
    pub fn available_range(&self) -> Option<TimeRange> {
        match self {
            MediaReference::External(r) => r.available_range,
            MediaReference::ImageSequence(r) => r.available_range,
            MediaReference::Missing(r) => r.available_range,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            MediaReference::External(r) => &r.metadata,
            MediaReference::ImageSequence(r) => &r.metadata,
            MediaReference::Missing(r) => &r.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            MediaReference::External(r) => &mut r.metadata,
            MediaReference::ImageSequence(r) => &mut r.metadata,
            MediaReference::Missing(r) => &mut r.metadata,
        }
    }
}

/// A single media file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalReference {
    #[serde(default)]
    pub name: String,
    pub target_url: String,
    pub available_range: Option<TimeRange>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Numbered image files sharing a prefix and suffix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSequenceReference {
    #[serde(default)]
    pub name: String,
    pub target_url_base: String,
    pub name_prefix: String,
    pub name_suffix: String,
    pub start_frame: i64,
    pub frame_step: i64,
    pub rate: f64,
    pub frame_zero_padding: usize,
    pub missing_frame_policy: String,
    pub available_range: Option<TimeRange>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ImageSequenceReference {
    /// Path of the image at `frame`.
    pub fn target_url_for_frame(&self, frame: i64) -> String {
        format!(
            "{}{}{:0width$}{}",
            self.target_url_base,
            self.name_prefix,
            frame,
            self.name_suffix,
            width = self.frame_zero_padding
        )
    }
}

/// Placeholder for media that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingReference {
    #[serde(default)]
    pub name: String,
    pub available_range: Option<TimeRange>,
    #[serde(default)]
    pub metadata: Metadata,
}

// ── Composition ─────────────────────────────────────────────────

/// A range of media placed on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "Clip.2")]
pub struct Clip {
    pub name: String,
    pub source_range: Option<TimeRange>,
    pub media_references: BTreeMap<String, MediaReference>,
    pub active_media_reference_key: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_true() -> bool {
    true
}

impl Clip {
    pub fn new(name: impl Into<String>, source_range: TimeRange, reference: MediaReference) -> Self {
        Self {
            name: name.into(),
            source_range: Some(source_range),
            media_references: BTreeMap::from([(DEFAULT_MEDIA_KEY.to_string(), reference)]),
            active_media_reference_key: DEFAULT_MEDIA_KEY.to_string(),
            effects: Vec::new(),
            markers: Vec::new(),
            enabled: true,
            metadata: Metadata::new(),
        }
    }

    pub fn media_reference(&self) -> Option<&MediaReference> {
        self.media_references.get(&self.active_media_reference_key)
    }
}

/// Empty space on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "Gap.1")]
pub struct Gap {
    #[serde(default)]
    pub name: String,
    pub source_range: TimeRange,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Gap {
    /// Gap of `duration` frames.
    pub fn with_duration(duration: f64, rate: f64) -> Self {
        Self {
            name: String::new(),
            source_range: TimeRange::from_frames(0.0, duration, rate),
            effects: Vec::new(),
            markers: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    pub fn duration(&self) -> RationalTime {
        self.source_range.duration
    }
}

/// One element of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackChild {
    Clip(Clip),
    Gap(Gap),
}

impl TrackChild {
    pub fn as_clip(&self) -> Option<&Clip> {
        match self {
            TrackChild::Clip(clip) => Some(clip),
            TrackChild::Gap(_) => None,
        }
    }

    pub fn as_gap(&self) -> Option<&Gap> {
        match self {
            TrackChild::Gap(gap) => Some(gap),
            TrackChild::Clip(_) => None,
        }
    }
}

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// A sequence of clips and gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "Track.1")]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    #[serde(default)]
    pub children: Vec<TrackChild>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    pub source_range: Option<TimeRange>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Track {
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            name: name.into(),
            kind,
            children: Vec::new(),
            markers: Vec::new(),
            effects: Vec::new(),
            source_range: None,
            metadata: Metadata::new(),
        }
    }

    pub fn append(&mut self, child: TrackChild) {
        self.children.push(child);
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.children.iter().filter_map(TrackChild::as_clip)
    }
}

/// Parallel tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "Stack.1")]
pub struct Stack {
    pub name: String,
    #[serde(default)]
    pub children: Vec<Track>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    pub source_range: Option<TimeRange>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            name: "tracks".to_string(),
            children: Vec::new(),
            markers: Vec::new(),
            effects: Vec::new(),
            source_range: None,
            metadata: Metadata::new(),
        }
    }
}

/// Top-level interchange object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "OTIO_SCHEMA", rename = "Timeline.1")]
pub struct Timeline {
    pub name: String,
    pub global_start_time: Option<RationalTime>,
    pub tracks: Stack,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Timeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            global_start_time: None,
            tracks: Stack::default(),
            metadata: Metadata::new(),
        }
    }

    /// Every clip of every track, in track order.
    pub fn find_clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.children.iter().flat_map(Track::clips)
    }
}
