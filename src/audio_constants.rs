//! Centralized constants for clip encoding and occurrence tracking.
//!
//! Capture format values match what the detection pipeline records: 48 kHz,
//! 16-bit signed little-endian PCM, mono. Everything that needs a default
//! format or window reads it from here.

// =============================================================================
// CAPTURE FORMAT
// =============================================================================

/// Sample rate of captured detection audio (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Bits per sample of captured PCM.
///
/// Incoming audio is always signed 16-bit little-endian; this is also the
/// only depth the encoder accepts.
pub const PCM_BIT_DEPTH: u16 = 16;

/// Channel count of captured audio.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Bytes per single-channel PCM sample.
pub const BYTES_PER_SAMPLE: usize = (PCM_BIT_DEPTH / 8) as usize;

// =============================================================================
// OCCURRENCE TRACKING
// =============================================================================

/// Default occurrence window in milliseconds (10 seconds).
///
/// Repeated detections of the same label within this span of the first
/// detection count as one burst.
pub const DEFAULT_OCCURRENCE_WINDOW_MS: u64 = 10_000;

// =============================================================================
// CLIP STORAGE
// =============================================================================

/// Application directory name used under the platform data dir.
pub const APP_DIR_NAME: &str = "birdclip";

/// Subdirectory for saved detection clips.
pub const CLIPS_DIR_NAME: &str = "clips";

/// Suffixed names tried before giving up when a clip name is taken.
pub const MAX_CLIP_NAME_ATTEMPTS: u32 = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_sample_matches_bit_depth() {
        assert_eq!(BYTES_PER_SAMPLE, 2);
        assert_eq!(BYTES_PER_SAMPLE * 8, PCM_BIT_DEPTH as usize);
    }

    #[test]
    fn test_default_window_is_ten_seconds() {
        assert_eq!(DEFAULT_OCCURRENCE_WINDOW_MS, 10_000);
    }
}
