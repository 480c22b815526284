//! Host snapshot files with versioning and migration.
//!
//! Uses JSON with a schema version field for forward-compatible persistence.

use std::path::Path;

use editmark_core::{EditMarkError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::project::Project;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Versioned snapshot wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Schema version for migration.
    pub version: u32,
    /// The host project.
    pub project: Project,
    /// Tool version that wrote this file.
    pub app_version: String,
}

impl ProjectFile {
    /// Wrap a project.
    pub fn new(project: Project) -> Self {
        Self {
            version: CURRENT_VERSION,
            project,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| EditMarkError::Serialization(format!("Failed to serialize snapshot: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| EditMarkError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if version > CURRENT_VERSION {
            return Err(EditMarkError::Serialization(format!(
                "Snapshot version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| EditMarkError::Serialization(format!("Failed to parse snapshot: {}", e)))
    }

    /// Save to a file path.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Upgrade a raw snapshot one version at a time until it is current.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    for version in from_version..CURRENT_VERSION {
        data = match version {
            0 => wrap_bare_project(data),
            1 => sequences_as_list(data),
            other => {
                return Err(EditMarkError::Serialization(format!(
                    "No migration path from snapshot version {}",
                    other
                )))
            }
        };
        debug!(from = version, to = version + 1, "migrated snapshot");
    }
    Ok(data)
}

/// v0 snapshots are a bare project without the versioned wrapper.
fn wrap_bare_project(data: serde_json::Value) -> serde_json::Value {
    if data.get("version").is_some() {
        return data;
    }
    serde_json::json!({
        "version": 1,
        "project": data,
        "app_version": "0.1.0",
    })
}

/// v1 projects held one `sequence` instead of a `sequences` list.
fn sequences_as_list(mut data: serde_json::Value) -> serde_json::Value {
    if let Some(project) = data.get_mut("project").and_then(|p| p.as_object_mut()) {
        if let Some(sequence) = project.remove("sequence") {
            project.insert("sequences".into(), serde_json::json!([sequence]));
        }
    }
    if let Some(root) = data.as_object_mut() {
        root.insert("version".into(), serde_json::json!(2));
    }
    data
}
