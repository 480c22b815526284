//! Creator and collector settings.
//!
//! Mirrors the project settings the pipeline server hands to the host
//! integration. Every field has a default, so a partial JSON document is
//! enough to override single values.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, Result};

/// Defaults for the shot creator's pre-create options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateSettings {
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
    pub product_variant: String,
    pub product_type: String,
    pub export_audio: bool,
    pub source_resolution: bool,
    pub workfile_frame_start: i64,
    pub handle_start: i64,
    pub handle_end: i64,
}

impl Default for CreateSettings {
    fn default() -> Self {
        Self {
            hierarchy: "{folder}/{sequence}".into(),
            clip_rename: true,
            clip_name: "{shot}".into(),
            count_from: 10,
            count_steps: 10,
            folder: "shots".into(),
            episode: "ep01".into(),
            sequence: "sq01".into(),
            track: "{_track_}".into(),
            shot: "sh###".into(),
            v_sync_on: false,
            product_variant: "<track_name>".into(),
            product_type: "plate".into(),
            export_audio: false,
            source_resolution: false,
            workfile_frame_start: 1001,
            handle_start: 10,
            handle_end: 10,
        }
    }
}

/// Groups effects into one publishable product by node class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectCategory {
    pub name: String,
    #[serde(default)]
    pub effect_classes: Vec<String>,
}

/// Groups effects into one publishable product by the track they sit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTrackCategory {
    pub name: String,
    #[serde(default)]
    pub track_names: Vec<String>,
}

/// Settings of the collection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectSettings {
    /// Only collect instances of clips selected in the host
    pub collect_selected_instances: bool,
    pub effect_categories: Vec<EffectCategory>,
    pub effect_tracks: Vec<EffectTrackCategory>,
}

/// Field renames applied when upgrading flat legacy tags.
///
/// Older integrations stored the same concept under different keys, so the
/// table is picked per document generation. Keys absent from the table are
/// carried over under their own name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum LegacyFieldMap {
    /// `asset` held the product name
    #[default]
    V1,
    /// `asset_name` held the folder name
    V2,
    /// Explicit legacy key to modern key table
    Custom { fields: IndexMap<String, String> },
}

impl LegacyFieldMap {
    /// The rename table for this generation.
    pub fn renames(&self) -> IndexMap<String, String> {
        let pairs: &[(&str, &str)] = match self {
            LegacyFieldMap::V1 => &[("asset", "productName"), ("family", "productType")],
            LegacyFieldMap::V2 => &[("asset_name", "folderName"), ("family", "productType")],
            LegacyFieldMap::Custom { fields } => return fields.clone(),
        };
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Modern key for a legacy key.
    pub fn modern_key(&self, legacy: &str) -> String {
        self.renames()
            .get(legacy)
            .cloned()
            .unwrap_or_else(|| legacy.to_string())
    }
}

/// All settings of the integration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub create: CreateSettings,
    pub collect: CollectSettings,
    pub legacy_fields: LegacyFieldMap,
}

impl Settings {
    /// Parse settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PublishError::Serialization(format!("Failed to parse settings: {e}")))
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save settings as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Settings file below a configuration root.
    pub fn path_in(config_root: &Path) -> PathBuf {
        config_root.join("editmark").join("settings.json")
    }
}
