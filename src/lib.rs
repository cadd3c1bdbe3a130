//! Occurrence debouncing and detection clip encoding.
//!
//! - `occurrence`: reports whether a detection label repeats the current run
//!   within a fixed window, forgetting the run once the window elapses
//! - `audio`: encodes raw 16-bit PCM detection audio as WAV
//! - `config` / `context`: settings and the explicitly constructed context
//!   that owns the monitor

// Enable coverage attribute on nightly for explicit exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod audio;
pub mod audio_constants;
pub mod config;
pub mod context;
pub mod occurrence;

// Re-export log macros for use throughout the crate
pub use log::{debug, error, info, trace, warn};

pub use audio::{convert_pcm_to_wav, save_pcm_to_wav, PcmFormat, WavEncodingError};
pub use config::{ConfigError, Settings};
pub use context::{AppContext, ContextError};
pub use occurrence::{OccurrenceError, OccurrenceMonitor, OccurrenceStatus};
