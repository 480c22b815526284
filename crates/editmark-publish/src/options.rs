//! Pre-create options of the shot creator.

use serde::{Deserialize, Serialize};

use crate::settings::CreateSettings;

/// Review track value meaning "no review track".
pub const NO_REVIEW_TRACK: &str = "< none >";

/// Variant value meaning "use the track name".
pub const TRACK_NAME_VARIANT: &str = "<track_name>";

/// Hierarchy template used when none is given.
pub const DEFAULT_HIERARCHY: &str = "{_folder_}/{_sequence_}/{_track_}";

/// Clip name template used when none is given.
pub const DEFAULT_CLIP_NAME: &str = "shot_{_trackIndex_:0>3}_{_clipIndex_:0>4}";

/// Hierarchy tokens a user can fill, in resolution order.
pub const HIERARCHY_TOKENS: [&str; 5] = ["folder", "episode", "sequence", "track", "shot"];

/// Options chosen for one create pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateOptions {
    /// Restrict creation to the host selection
    #[serde(rename = "use_selection")]
    pub use_selection: bool,
    pub hierarchy: String,
    pub clip_rename: bool,
    pub clip_name: String,
    pub count_from: i64,
    pub count_steps: i64,
    pub folder: String,
    pub episode: String,
    pub sequence: String,
    pub track: String,
    pub shot: String,
    pub v_sync_on: bool,
    /// Name of the hero track
    pub v_sync_track: String,
    #[serde(rename = "clip_variant")]
    pub clip_variant: String,
    pub product_type: String,
    pub review_track: String,
    #[serde(rename = "export_audio")]
    pub export_audio: bool,
    pub source_resolution: bool,
    pub workfile_frame_start: i64,
    pub handle_start: i64,
    pub handle_end: i64,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self::from_settings(&CreateSettings::default())
    }
}

impl CreateOptions {
    /// Options seeded from creator settings.
    pub fn from_settings(settings: &CreateSettings) -> Self {
        Self {
            use_selection: true,
            hierarchy: settings.hierarchy.clone(),
            clip_rename: settings.clip_rename,
            clip_name: settings.clip_name.clone(),
            count_from: settings.count_from,
            count_steps: settings.count_steps,
            folder: settings.folder.clone(),
            episode: settings.episode.clone(),
            sequence: settings.sequence.clone(),
            track: settings.track.clone(),
            shot: settings.shot.clone(),
            v_sync_on: settings.v_sync_on,
            v_sync_track: String::new(),
            clip_variant: settings.product_variant.clone(),
            product_type: settings.product_type.clone(),
            review_track: NO_REVIEW_TRACK.into(),
            export_audio: settings.export_audio,
            source_resolution: settings.source_resolution,
            workfile_frame_start: settings.workfile_frame_start,
            handle_start: settings.handle_start,
            handle_end: settings.handle_end,
        }
    }

    pub fn with_hero_track(mut self, track: impl Into<String>) -> Self {
        self.v_sync_on = true;
        self.v_sync_track = track.into();
        self
    }

    pub fn with_review_track(mut self, track: impl Into<String>) -> Self {
        self.review_track = track.into();
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: impl Into<String>) -> Self {
        self.hierarchy = hierarchy.into();
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.clip_variant = variant.into();
        self
    }

    /// Hierarchy template, falling back to the track-based default.
    pub fn hierarchy_template(&self) -> &str {
        non_empty(&self.hierarchy).unwrap_or(DEFAULT_HIERARCHY)
    }

    /// Clip name template, falling back to the index-based default.
    pub fn clip_name_template(&self) -> &str {
        non_empty(&self.clip_name).unwrap_or(DEFAULT_CLIP_NAME)
    }

    /// Raw value of a hierarchy token.
    pub fn token(&self, key: &str) -> Option<&str> {
        let value = match key {
            "folder" => &self.folder,
            "episode" => &self.episode,
            "sequence" => &self.sequence,
            "track" => &self.track,
            "shot" => &self.shot,
            _ => return None,
        };
        non_empty(value)
    }

    /// Review track name, unless it is the "none" placeholder.
    pub fn review_track_name(&self) -> Option<&str> {
        non_empty(&self.review_track).filter(|t| *t != NO_REVIEW_TRACK)
    }

    /// Hero track name when vertical sync is on.
    pub fn hero_track(&self) -> Option<&str> {
        self.v_sync_on.then_some(self.v_sync_track.as_str())
    }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.trim().is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_settings() {
        let options = CreateOptions::default();
        assert_eq!(options.hierarchy_template(), "{folder}/{sequence}");
        assert_eq!(options.token("shot"), Some("sh###"));
        assert_eq!(options.token("unknown"), None);
        assert_eq!(options.review_track_name(), None);
        assert_eq!(options.hero_track(), None);
    }

    #[test]
    fn test_empty_templates_fall_back() {
        let options = CreateOptions {
            hierarchy: String::new(),
            clip_name: " ".into(),
            ..CreateOptions::default()
        };
        assert_eq!(options.hierarchy_template(), DEFAULT_HIERARCHY);
        assert_eq!(options.clip_name_template(), DEFAULT_CLIP_NAME);
    }

    #[test]
    fn test_hero_and_review() {
        let options = CreateOptions::default()
            .with_hero_track("Hero")
            .with_review_track("ref");
        assert_eq!(options.hero_track(), Some("Hero"));
        assert_eq!(options.review_track_name(), Some("ref"));
    }

    #[test]
    fn test_camel_case_keys() {
        let options: CreateOptions = serde_json::from_str(
            r#"{"vSyncOn": true, "vSyncTrack": "main", "clip_variant": "bg", "export_audio": true}"#,
        )
        .unwrap();
        assert_eq!(options.hero_track(), Some("main"));
        assert_eq!(options.clip_variant, "bg");
        assert!(options.export_audio);
        assert_eq!(options.count_from, 10);
    }
}
