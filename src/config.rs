//! Settings for occurrence tracking and clip encoding.
//!
//! Settings persist as camelCase JSON (`settings.json`). Missing fields fall
//! back to the defaults in `audio_constants`, so a partial file is valid.

use crate::audio::{default_clips_dir, PcmFormat};
use crate::audio_constants::DEFAULT_OCCURRENCE_WINDOW_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file name
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Errors that can occur while loading or saving settings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the settings file failed
    #[error("Settings I/O error: {0}")]
    Io(String),
    /// The settings file is not valid JSON for `Settings`
    #[error("Failed to parse settings: {0}")]
    Parse(String),
    /// The settings could not be encoded as JSON (e.g. a non UTF-8 path)
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),
    /// A setting is out of range
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Occurrence tracking settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OccurrenceSettings {
    /// Window in milliseconds, measured from the first detection of a run (default: 10000)
    pub window_ms: u64,
}

impl Default for OccurrenceSettings {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_OCCURRENCE_WINDOW_MS,
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub occurrence: OccurrenceSettings,
    /// Format of captured PCM handed to the clip encoder
    pub audio: PcmFormat,
    /// Where detection clips are written (None = platform default)
    pub clips_dir: Option<PathBuf>,
}

impl Settings {
    /// Load and validate settings from a JSON file
    ///
    /// # Errors
    /// - `Io` if the file cannot be read
    /// - `Parse` if the contents are not valid settings JSON
    /// - `Invalid` if a value is out of range
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let settings: Settings =
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        crate::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, or use defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            crate::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validate and write settings as pretty-printed JSON
    ///
    /// Missing parent directories are created. Nothing is written if the
    /// settings are invalid or cannot be serialized.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        std::fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Check that all values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.occurrence.window_ms == 0 {
            return Err(ConfigError::Invalid(
                "occurrence.windowMs must be greater than zero".to_string(),
            ));
        }
        self.audio
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("audio: {}", e)))
    }

    /// Occurrence window as a Duration
    pub fn occurrence_window(&self) -> Duration {
        Duration::from_millis(self.occurrence.window_ms)
    }

    /// Resolved clips directory
    pub fn clips_dir(&self) -> PathBuf {
        self.clips_dir.clone().unwrap_or_else(default_clips_dir)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
