// WAV encoding for raw PCM detection audio
//
// Input is signed 16-bit little-endian PCM as delivered by the capture
// pipeline. Output is either an in-memory WAV byte buffer or a file on disk.

use crate::audio_constants::{
    APP_DIR_NAME, BYTES_PER_SAMPLE, CLIPS_DIR_NAME, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
    MAX_CLIP_NAME_ATTEMPTS, PCM_BIT_DEPTH,
};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Cursor, ErrorKind, Seek, Write};
use std::path::{Path, PathBuf};

/// Errors that can occur during WAV encoding
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WavEncodingError {
    /// I/O error (directory creation, file write)
    #[error("I/O error: {0}")]
    IoError(String),
    /// Error during WAV encoding
    #[error("Encoding error: {0}")]
    EncodingError(String),
    /// Invalid input (unsupported format, empty clip)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convert a hound error to WavEncodingError
#[cfg_attr(coverage_nightly, coverage(off))]
fn hound_error(e: hound::Error) -> WavEncodingError {
    match e {
        hound::Error::IoError(io) => WavEncodingError::IoError(io.to_string()),
        other => WavEncodingError::EncodingError(other.to_string()),
    }
}

/// Format of raw PCM input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PcmFormat {
    /// Sample rate in Hz (default: 48000)
    pub sample_rate: u32,
    /// Bits per sample; only 16 is supported (default: 16)
    pub bit_depth: u16,
    /// Interleaved channel count (default: 1)
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: PCM_BIT_DEPTH,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl PcmFormat {
    /// Check that the format can be encoded
    ///
    /// # Errors
    /// Returns `InvalidInput` for a zero sample rate, zero channels, or a bit
    /// depth other than 16.
    pub fn validate(&self) -> Result<(), WavEncodingError> {
        if self.sample_rate == 0 {
            return Err(WavEncodingError::InvalidInput(
                "Sample rate must be greater than zero".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(WavEncodingError::InvalidInput(
                "Channel count must be greater than zero".to_string(),
            ));
        }
        if self.bit_depth != PCM_BIT_DEPTH {
            return Err(WavEncodingError::InvalidInput(format!(
                "Unsupported bit depth: {}. Only {}-bit PCM is supported.",
                self.bit_depth, PCM_BIT_DEPTH
            )));
        }
        Ok(())
    }

    fn wav_spec(&self) -> Result<hound::WavSpec, WavEncodingError> {
        self.validate()?;
        Ok(hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bit_depth,
            sample_format: hound::SampleFormat::Int,
        })
    }
}

/// Decode little-endian 16-bit PCM bytes into samples
///
/// A trailing odd byte is ignored.
pub fn pcm_bytes_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Write PCM bytes through an open WAV writer and finalize it
///
/// Samples that do not fill a complete frame at the end are dropped.
fn write_pcm<W: Write + Seek>(
    mut wav_writer: hound::WavWriter<W>,
    pcm: &[u8],
    channels: u16,
) -> Result<(), WavEncodingError> {
    let samples = pcm_bytes_to_samples(pcm);
    let whole_frames = samples.len() / channels as usize * channels as usize;
    if whole_frames < samples.len() {
        crate::trace!(
            "[wav] Dropping {} sample(s) of incomplete trailing frame",
            samples.len() - whole_frames
        );
    }

    for &sample in &samples[..whole_frames] {
        wav_writer.write_sample(sample).map_err(hound_error)?;
    }

    wav_writer.finalize().map_err(hound_error)
}

/// Encode raw PCM into an in-memory WAV file
///
/// # Arguments
/// * `pcm` - Little-endian signed 16-bit PCM bytes
/// * `format` - Sample rate, bit depth and channel count of `pcm`
///
/// # Returns
/// * `Ok(Vec<u8>)` - Complete WAV file (header and data)
/// * `Err(WavEncodingError)` - If the format is invalid or encoding fails
pub fn convert_pcm_to_wav(pcm: &[u8], format: &PcmFormat) -> Result<Vec<u8>, WavEncodingError> {
    let spec = format.wav_spec()?;
    let mut buffer = Cursor::new(Vec::with_capacity(pcm.len() + 44));

    let wav_writer = hound::WavWriter::new(&mut buffer, spec).map_err(hound_error)?;
    write_pcm(wav_writer, pcm, format.channels)?;

    Ok(buffer.into_inner())
}

/// Encode raw PCM and write it as a WAV file at `path`
///
/// Missing parent directories are created first.
pub fn save_pcm_to_wav(
    path: &Path,
    pcm: &[u8],
    format: &PcmFormat,
) -> Result<(), WavEncodingError> {
    let spec = format.wav_spec()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            WavEncodingError::IoError(format!("Failed to create directories: {}", e))
        })?;
    }

    let wav_writer = hound::WavWriter::create(path, spec).map_err(hound_error)?;
    write_pcm(wav_writer, pcm, format.channels)
}

/// Trait for clip file system operations (allows mocking in tests)
pub trait ClipWriter {
    /// Get the output directory path
    fn output_dir(&self) -> PathBuf;

    /// Generate a unique filename for a clip of `label`
    fn generate_filename(&self, label: &str) -> String;

    /// Create directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> Result<(), std::io::Error>;

    /// Check if a path exists
    fn path_exists(&self, path: &Path) -> bool;
}

/// Production clip writer using the real filesystem
pub struct SystemClipWriter {
    clips_dir: PathBuf,
}

impl SystemClipWriter {
    /// Create a writer for a specific clips directory
    pub fn new(clips_dir: PathBuf) -> Self {
        Self { clips_dir }
    }

    /// Create a writer for the default clips directory
    pub fn with_default_dir() -> Self {
        Self::new(default_clips_dir())
    }
}

impl ClipWriter for SystemClipWriter {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn output_dir(&self) -> PathBuf {
        self.clips_dir.clone()
    }

    fn generate_filename(&self, label: &str) -> String {
        let now = chrono::Utc::now();
        format!(
            "{}-{}.wav",
            sanitize_label(label),
            now.format("%Y-%m-%d-%H%M%S%3f")
        )
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    fn create_dir_all(&self, path: &Path) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(path)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Default directory for detection clips
///
/// `<data dir>/birdclip/clips`, or `./birdclip/clips` when the platform has
/// no data directory.
pub fn default_clips_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(CLIPS_DIR_NAME)
}

/// Make a detection label safe for use in a filename
pub fn sanitize_label(label: &str) -> String {
    let sanitized: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "unlabeled".to_string()
    } else {
        sanitized
    }
}

/// Check that `pcm` can be saved as a clip in `format`
///
/// # Errors
/// Returns `InvalidInput` if `pcm` holds no complete sample or the format
/// is invalid.
pub fn validate_clip(pcm: &[u8], format: &PcmFormat) -> Result<(), WavEncodingError> {
    if pcm.len() < BYTES_PER_SAMPLE {
        return Err(WavEncodingError::InvalidInput(
            "Cannot save an empty clip".to_string(),
        ));
    }
    format.validate()
}

/// Create `filename` in `dir`, adding a numeric suffix if it is taken
///
/// The file is opened with `create_new`, so an existing clip is never
/// overwritten, even by a concurrent save.
fn create_unique_clip_file(dir: &Path, filename: &str) -> Result<(PathBuf, File), WavEncodingError> {
    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let extension = name
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wav".to_string());

    for attempt in 0..MAX_CLIP_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            dir.join(filename)
        } else {
            dir.join(format!("{}-{}.{}", stem, attempt, extension))
        };

        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(WavEncodingError::IoError(e.to_string())),
        }
    }

    Err(WavEncodingError::IoError(format!(
        "No free clip name for {} after {} attempts",
        filename, MAX_CLIP_NAME_ATTEMPTS
    )))
}

/// Save a detection clip through `writer`
///
/// # Arguments
/// * `pcm` - Little-endian signed 16-bit PCM bytes
/// * `format` - Format of `pcm`
/// * `label` - Detection label, used in the filename
/// * `writer` - File writer for filesystem operations
///
/// # Returns
/// * `Ok(PathBuf)` - Path to the created WAV file; a `-N` suffix is added
///   when the generated name is already taken
/// * `Err(WavEncodingError)` - If the clip is empty or writing fails
pub fn save_clip<W: ClipWriter>(
    pcm: &[u8],
    format: &PcmFormat,
    label: &str,
    writer: &W,
) -> Result<PathBuf, WavEncodingError> {
    validate_clip(pcm, format)?;
    let spec = format.wav_spec()?;

    let output_dir = writer.output_dir();
    if !writer.path_exists(&output_dir) {
        writer
            .create_dir_all(&output_dir)
            .map_err(|e| WavEncodingError::IoError(e.to_string()))?;
    }

    let (file_path, file) = create_unique_clip_file(&output_dir, &writer.generate_filename(label))?;
    crate::info!("[wav] Saving clip to: {}", file_path.display());

    let wav_writer = hound::WavWriter::new(BufWriter::new(file), spec).map_err(hound_error)?;
    write_pcm(wav_writer, pcm, format.channels)?;

    Ok(file_path)
}

/// Parse the duration of a WAV file from its header
///
/// # Returns
/// * `Ok(f64)` - Duration in seconds
/// * `Err(WavEncodingError)` - If the file cannot be read or is not a valid WAV
pub fn parse_duration_from_file(path: &Path) -> Result<f64, WavEncodingError> {
    let reader = hound::WavReader::open(path).map_err(hound_error)?;
    let spec = reader.spec();
    let num_frames = reader.duration();

    if spec.sample_rate == 0 {
        return Err(WavEncodingError::InvalidInput(
            "WAV file has invalid sample rate of 0".to_string(),
        ));
    }

    Ok(num_frames as f64 / spec.sample_rate as f64)
}
