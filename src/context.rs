//! Application context holding settings and the shared occurrence monitor.
//!
//! Built once by the host and passed to whatever needs occurrence tracking
//! or clip output. There is no process-wide instance.

use crate::audio::{save_clip, validate_clip, SystemClipWriter, WavEncodingError};
use crate::config::{ConfigError, Settings};
use crate::occurrence::{OccurrenceError, OccurrenceMonitor};
use std::path::PathBuf;
use std::sync::Arc;

/// Errors that can occur while building an AppContext
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Occurrence(#[from] OccurrenceError),
}

/// Settings plus the occurrence monitor configured from them
pub struct AppContext {
    pub settings: Settings,
    pub occurrence_monitor: Arc<OccurrenceMonitor>,
}

impl AppContext {
    /// Validate `settings` and create the occurrence monitor
    pub fn new(settings: Settings) -> Result<Self, ContextError> {
        settings.validate()?;
        let occurrence_monitor = Arc::new(OccurrenceMonitor::new(settings.occurrence_window())?);

        crate::info!(
            "Context ready (occurrence window {}ms, clips in {})",
            settings.occurrence.window_ms,
            settings.clips_dir().display()
        );
        Ok(Self {
            settings,
            occurrence_monitor,
        })
    }

    /// Clip writer for the configured clips directory
    pub fn clip_writer(&self) -> SystemClipWriter {
        SystemClipWriter::new(self.settings.clips_dir())
    }

    /// Record a detection and save its clip unless it repeats the current run
    ///
    /// The clip is validated before the label is observed, so a rejected
    /// clip does not start a run. An I/O failure while writing happens after
    /// the run has started; the detection still counts and later repeats in
    /// the same window return `Ok(None)`.
    ///
    /// # Returns
    /// * `Ok(Some(path))` - First detection of a run; clip written to `path`
    /// * `Ok(None)` - Repeat within the window; nothing written
    pub fn record_detection(
        &self,
        label: &str,
        pcm: &[u8],
    ) -> Result<Option<PathBuf>, WavEncodingError> {
        validate_clip(pcm, &self.settings.audio)?;

        if self.occurrence_monitor.observe(label) {
            crate::debug!("Skipping clip for repeated detection '{}'", label);
            return Ok(None);
        }
        save_clip(pcm, &self.settings.audio, label, &self.clip_writer()).map(Some)
    }
}
