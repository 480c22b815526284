//! Project and sequence types.

use std::collections::BTreeMap;

use editmark_core::{EditMarkError, FrameRate, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::item::{Format, ItemRef, TrackItem};
use crate::tag::{Tag, TagStore};
use crate::track::{Track, TrackKind};

/// A host project containing sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,
    /// Project name
    pub name: String,
    /// Default frame rate
    pub frame_rate: FrameRate,
    /// Colour management settings, carried into exported timelines
    #[serde(default)]
    pub settings: BTreeMap<String, serde_json::Value>,
    /// Sequences in this project
    pub sequences: Vec<Sequence>,
    /// Index of the sequence open in the timeline view
    #[serde(default)]
    pub active: usize,
    /// Project-level tags, the records that belong to no timeline item
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Project {
    /// Create a new empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frame_rate: FrameRate::FPS_24,
            settings: BTreeMap::new(),
            sequences: Vec::new(),
            active: 0,
            tags: Vec::new(),
        }
    }

    /// Add a new sequence to the project.
    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    /// Get the active sequence.
    pub fn active_sequence(&self) -> Option<&Sequence> {
        self.sequences.get(self.active)
    }

    /// Get the active sequence mutably.
    pub fn active_sequence_mut(&mut self) -> Option<&mut Sequence> {
        self.sequences.get_mut(self.active)
    }

    /// Make the named sequence active.
    pub fn activate(&mut self, name: &str) -> Result<()> {
        self.active = self
            .sequences
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| EditMarkError::NotFound(format!("sequence '{}'", name)))?;
        Ok(())
    }

    /// The project tag with the given name.
    pub fn project_tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Project tags whose name ends with `suffix`.
    pub fn project_tags_ending_with<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = &'a Tag> {
        self.tags.iter().filter(move |t| t.name.ends_with(suffix))
    }

    /// Write a record into the named project tag, creating it if missing.
    pub fn imprint_project_tag(
        &mut self,
        name: &str,
        note: &str,
        data: &Map<String, Value>,
    ) -> Result<Tag> {
        let index = match self.tags.iter().position(|t| t.name == name) {
            Some(index) => index,
            None => {
                self.tags.push(Tag::new(name));
                self.tags.len() - 1
            }
        };
        let tag = &mut self.tags[index];
        tag.note = note.to_string();
        tag.visible = false;
        tag.set_json_metadata(data)?;
        Ok(tag.clone())
    }

    /// Record held by the named project tag. `None` when the tag is missing
    /// or carries no record.
    pub fn read_project_tag(&self, name: &str) -> Result<Option<Map<String, Value>>> {
        self.project_tag(name)
            .and_then(Tag::json_metadata)
            .transpose()
    }

    /// Drop the named project tag.
    pub fn remove_project_tag(&mut self, name: &str) -> Option<Tag> {
        let index = self.tags.iter().position(|t| t.name == name)?;
        Some(self.tags.remove(index))
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled Project")
    }
}

/// A sequence (timeline) containing tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    /// Unique sequence ID
    pub id: Uuid,
    /// Sequence name
    pub name: String,
    /// Frame rate
    pub frame_rate: FrameRate,
    /// Picture format
    #[serde(default)]
    pub format: Format,
    /// Start timecode in frames
    #[serde(default)]
    pub timecode_start: i64,
    /// Video tracks
    #[serde(default)]
    pub video_tracks: Vec<Track>,
    /// Audio tracks
    #[serde(default)]
    pub audio_tracks: Vec<Track>,
    /// GUIDs of the items selected in the timeline view
    #[serde(default)]
    pub selection: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Sequence {
    /// Create a new empty sequence.
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            frame_rate,
            format: Format::default(),
            timecode_start: 0,
            video_tracks: Vec::new(),
            audio_tracks: Vec::new(),
            selection: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add a track, routed by its kind.
    pub fn add_track(&mut self, track: Track) {
        match track.kind {
            TrackKind::Video => self.video_tracks.push(track),
            TrackKind::Audio => self.audio_tracks.push(track),
        }
    }

    /// All tracks, video first.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.video_tracks.iter().chain(self.audio_tracks.iter())
    }

    fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.video_tracks
            .iter_mut()
            .chain(self.audio_tracks.iter_mut())
    }

    /// Every placed item, track by track.
    pub fn items(&self) -> impl Iterator<Item = ItemRef<'_>> {
        self.tracks()
            .flat_map(|track| track.items.iter().map(move |item| ItemRef::new(item, track)))
    }

    /// Find a placed item by GUID.
    pub fn find_item(&self, guid: &str) -> Option<ItemRef<'_>> {
        self.items().find(|r| r.item().guid == guid)
    }

    /// Find an item mutably by GUID.
    pub fn find_item_mut(&mut self, guid: &str) -> Option<&mut TrackItem> {
        self.tracks_mut().find_map(|track| track.find_item_mut(guid))
    }

    /// Find a track by name.
    pub fn track_by_name(&self, name: &str) -> Option<&Track> {
        self.tracks().find(|t| t.name == name)
    }

    /// Rename a placed item.
    pub fn rename_item(&mut self, guid: &str, name: &str) -> Result<()> {
        let item = self
            .find_item_mut(guid)
            .ok_or_else(|| EditMarkError::NotFound(format!("track item '{}'", guid)))?;
        item.name = name.to_string();
        Ok(())
    }

    /// True when any audio track carries at least one item.
    pub fn has_audio(&self) -> bool {
        self.audio_tracks.iter().any(|t| !t.items.is_empty())
    }
}

impl TagStore for Sequence {
    fn item_tags(&self, guid: &str) -> Option<&[Tag]> {
        self.find_item(guid).map(|r| r.item().tags.as_slice())
    }

    fn add_item_tag(&mut self, guid: &str, tag: Tag) -> Result<()> {
        let item = self
            .find_item_mut(guid)
            .ok_or_else(|| EditMarkError::NotFound(format!("track item '{}'", guid)))?;
        item.tags.push(tag);
        Ok(())
    }

    fn replace_item_tag(&mut self, guid: &str, tag: Tag) -> Result<()> {
        let item = self
            .find_item_mut(guid)
            .ok_or_else(|| EditMarkError::NotFound(format!("track item '{}'", guid)))?;
        match item.tags.iter_mut().find(|t| t.name == tag.name) {
            Some(slot) => *slot = tag,
            None => {
                return Err(EditMarkError::Tag(format!(
                    "item '{}' has no tag named '{}'",
                    guid, tag.name
                )))
            }
        }
        Ok(())
    }

    fn remove_item_tag(&mut self, guid: &str, name: &str) -> Result<Option<Tag>> {
        let item = self
            .find_item_mut(guid)
            .ok_or_else(|| EditMarkError::NotFound(format!("track item '{}'", guid)))?;
        Ok(item
            .tags
            .iter()
            .position(|t| t.name == name)
            .map(|index| item.tags.remove(index)))
    }
}
