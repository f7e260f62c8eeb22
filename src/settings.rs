//! settings.rs
//! Listener settings that survive a restart.
//!
//! Only one thing is persisted: the last chosen volume, written through
//! on every change and reloaded when a session starts. It lives in a
//! small JSON file under an embedder-supplied directory so the session
//! itself never has to guess platform conventions.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PlayerError;

/// File name the settings are stored under, fixed across versions.
pub const SETTINGS_FILE: &str = "player-settings.json";

/// Persisted player settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerSettings {
    pub volume: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

impl PlayerSettings {
    /// Full path of the settings file inside `dir`.
    pub fn settings_path(dir: &Path) -> PathBuf {
        dir.join(SETTINGS_FILE)
    }

    /// Load settings from `dir`, or defaults if the file doesn't exist.
    ///
    /// A file that exists but can't be read or parsed is an error: we'd
    /// rather tell the caller than silently wipe their saved volume on
    /// the next write.
    pub fn load(dir: &Path) -> Result<Self, PlayerError> {
        let path = Self::settings_path(dir);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| PlayerError::Settings(format!("read {}: {e}", path.display())))?;

        serde_json::from_str(&content)
            .map_err(|e| PlayerError::Settings(format!("parse {}: {e}", path.display())))
    }

    /// Save settings into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<(), PlayerError> {
        fs::create_dir_all(dir)
            .map_err(|e| PlayerError::Settings(format!("create {}: {e}", dir.display())))?;

        let path = Self::settings_path(dir);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PlayerError::Settings(format!("serialize settings: {e}")))?;

        fs::write(&path, content)
            .map_err(|e| PlayerError::Settings(format!("write {}: {e}", path.display())))
    }
}
