//! Track types for the host timeline.

use std::collections::BTreeMap;

use editmark_core::FrameRange;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::TrackItem;
use crate::tag::Tag;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

/// One key of an animated knob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub frame: f64,
    pub value: f64,
}

/// A node parameter of a soft effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Knob {
    Static { value: serde_json::Value },
    Animated { keys: Vec<KeyFrame> },
}

impl Knob {
    pub fn is_animated(&self) -> bool {
        matches!(self, Knob::Animated { .. })
    }

    /// Value at a frame. Animated knobs interpolate linearly between keys
    /// and hold the first/last key outside them.
    pub fn value_at(&self, frame: f64) -> serde_json::Value {
        match self {
            Knob::Static { value } => value.clone(),
            Knob::Animated { keys } => serde_json::Value::from(interpolate(keys, frame)),
        }
    }

    /// Numeric value at a frame, when the knob holds a number.
    pub fn number_at(&self, frame: f64) -> Option<f64> {
        match self {
            Knob::Static { value } => value.as_f64(),
            Knob::Animated { keys } => Some(interpolate(keys, frame)),
        }
    }
}

fn interpolate(keys: &[KeyFrame], frame: f64) -> f64 {
    let Some(first) = keys.first() else {
        return 0.0;
    };
    if frame <= first.frame {
        return first.value;
    }
    for pair in keys.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if frame <= b.frame {
            let span = b.frame - a.frame;
            if span <= 0.0 {
                return b.value;
            }
            return a.value + (b.value - a.value) * (frame - a.frame) / span;
        }
    }
    keys.last().map_or(first.value, |k| k.value)
}

/// A soft effect living on a sub-track above the track's items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTrackItem {
    /// Effect item name, e.g. `TimeWarp1`
    pub name: String,
    /// Node class, e.g. `Grade`
    pub node_class: String,
    /// Node `name` knob
    #[serde(default)]
    pub node_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub timeline_in: i64,
    pub timeline_out: i64,
    /// Index of the sub-track within its track
    #[serde(default)]
    pub sub_track_index: usize,
    /// GUIDs of linked track items. Unlinked effects apply to every item.
    #[serde(default)]
    pub linked_items: Vec<String>,
    #[serde(default)]
    pub knobs: BTreeMap<String, Knob>,
}

pub(crate) fn default_true() -> bool {
    true
}

impl SubTrackItem {
    pub fn frame_range(&self) -> FrameRange {
        FrameRange::new(self.timeline_in, self.timeline_out)
    }

    /// True when the effect is linked to the item or linked to nothing.
    pub fn applies_to(&self, guid: &str) -> bool {
        self.linked_items.is_empty() || self.linked_items.iter().any(|g| g == guid)
    }
}

/// A track holding items and sub-track effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: Uuid,
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Host track index
    pub index: usize,
    /// Items ordered by timeline position
    #[serde(default)]
    pub items: Vec<TrackItem>,
    /// Sub-track effects
    #[serde(default)]
    pub sub_track_items: Vec<SubTrackItem>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Locked tracks are left out of creation
    #[serde(default)]
    pub locked: bool,
}

impl Track {
    fn new(name: impl Into<String>, kind: TrackKind, index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            index,
            items: Vec::new(),
            sub_track_items: Vec::new(),
            tags: Vec::new(),
            enabled: true,
            locked: false,
        }
    }

    /// Create a new video track.
    pub fn new_video(name: impl Into<String>, index: usize) -> Self {
        Self::new(name, TrackKind::Video, index)
    }

    /// Create a new audio track.
    pub fn new_audio(name: impl Into<String>, index: usize) -> Self {
        Self::new(name, TrackKind::Audio, index)
    }

    /// Insert an item keeping timeline order.
    pub fn add_item(&mut self, item: TrackItem) {
        let at = self
            .items
            .partition_point(|existing| existing.timeline_in <= item.timeline_in);
        self.items.insert(at, item);
    }

    /// Add a soft effect.
    pub fn add_effect(&mut self, effect: SubTrackItem) {
        self.sub_track_items.push(effect);
    }

    /// Find an item by GUID.
    pub fn find_item(&self, guid: &str) -> Option<&TrackItem> {
        self.items.iter().find(|item| item.guid == guid)
    }

    /// Find an item mutably by GUID.
    pub fn find_item_mut(&mut self, guid: &str) -> Option<&mut TrackItem> {
        self.items.iter_mut().find(|item| item.guid == guid)
    }

}
