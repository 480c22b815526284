//! Settings file location and loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use editmark_publish::Settings;
use tracing::{debug, info};

/// Settings file in the user config directory.
pub fn default_settings_path() -> PathBuf {
    Settings::path_in(&dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// Settings from an explicit file, else the user config file, else the
/// built-in defaults. An explicit file must exist.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    if let Some(path) = explicit {
        return Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }
    let path = default_settings_path();
    if path.exists() {
        info!(path = %path.display(), "loading settings");
        return Settings::load(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()));
    }
    debug!(path = %path.display(), "no settings file, using defaults");
    Ok(Settings::default())
}

/// Write the default settings. Refuses to replace an existing file unless
/// `force` is set.
pub fn init_settings(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, use --force to overwrite", path.display());
    }
    Settings::default()
        .save(path)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}
