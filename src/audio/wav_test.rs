#![cfg(test)]
#![cfg_attr(coverage_nightly, coverage(off))]

use super::wav::{
    convert_pcm_to_wav, parse_duration_from_file, pcm_bytes_to_samples, sanitize_label,
    save_clip, save_pcm_to_wav, validate_clip, ClipWriter, PcmFormat, SystemClipWriter,
    WavEncodingError,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// =============================================================================
// MockClipWriter for testing
// =============================================================================

struct MockClipWriter {
    output_dir: PathBuf,
    filename: String,
    should_fail_dir_creation: bool,
    created_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockClipWriter {
    fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            filename: "test-clip.wav".to_string(),
            should_fail_dir_creation: false,
            created_dirs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_dir_creation_failure(mut self) -> Self {
        self.should_fail_dir_creation = true;
        self
    }
}

impl ClipWriter for MockClipWriter {
    fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    fn generate_filename(&self, _label: &str) -> String {
        self.filename.clone()
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), std::io::Error> {
        if self.should_fail_dir_creation {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Permission denied",
            ));
        }
        self.created_dirs.lock().unwrap().push(path.to_path_buf());
        std::fs::create_dir_all(path)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn pcm_from_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn read_back(bytes: Vec<u8>) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

// =============================================================================
// PCM decoding
// =============================================================================

#[test]
fn test_pcm_bytes_are_little_endian() {
    let samples = pcm_bytes_to_samples(&[0x01, 0x00, 0xFF, 0x7F, 0x00, 0x80, 0xFF, 0xFF]);
    assert_eq!(samples, vec![1, i16::MAX, i16::MIN, -1]);
}

#[test]
fn test_pcm_trailing_odd_byte_is_ignored() {
    let samples = pcm_bytes_to_samples(&[0x10, 0x00, 0x20]);
    assert_eq!(samples, vec![16]);
    assert!(pcm_bytes_to_samples(&[0x42]).is_empty());
}

// =============================================================================
// Format validation
// =============================================================================

#[test]
fn test_default_format_is_48khz_16bit_mono() {
    let format = PcmFormat::default();
    assert_eq!(format.sample_rate, 48000);
    assert_eq!(format.bit_depth, 16);
    assert_eq!(format.channels, 1);
    assert!(format.validate().is_ok());
}

#[test]
fn test_invalid_formats_are_rejected() {
    let invalid = [
        PcmFormat { sample_rate: 0, ..Default::default() },
        PcmFormat { channels: 0, ..Default::default() },
        PcmFormat { bit_depth: 24, ..Default::default() },
        PcmFormat { bit_depth: 8, ..Default::default() },
    ];

    for format in invalid {
        let result = convert_pcm_to_wav(&[0, 0], &format);
        assert!(
            matches!(result, Err(WavEncodingError::InvalidInput(_))),
            "Should reject {:?}",
            format
        );
    }
}

#[test]
fn test_bit_depth_error_mentions_supported_depth() {
    let format = PcmFormat { bit_depth: 32, ..Default::default() };
    let msg = format.validate().unwrap_err().to_string();
    assert!(msg.contains("32") && msg.contains("16"));
}

// =============================================================================
// In-memory encoding
// =============================================================================

#[test]
fn test_convert_produces_riff_header() {
    let pcm = pcm_from_samples(&[0, 100, -100]);
    let bytes = convert_pcm_to_wav(&pcm, &PcmFormat::default()).unwrap();

    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
    // Data chunk comes last
    assert!(bytes.ends_with(&pcm));
}

#[test]
fn test_convert_preserves_samples_and_format() {
    let input = [0, 1, -1, i16::MAX, i16::MIN, 12345];
    let format = PcmFormat { sample_rate: 16000, ..Default::default() };

    let (spec, samples) = read_back(convert_pcm_to_wav(&pcm_from_samples(&input), &format).unwrap());

    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(samples, input.to_vec());
}

#[test]
fn test_convert_stereo_interleaved() {
    let input = [1, -1, 2, -2];
    let format = PcmFormat { channels: 2, ..Default::default() };

    let bytes = convert_pcm_to_wav(&pcm_from_samples(&input), &format).unwrap();
    let reader = hound::WavReader::new(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.duration(), 2);

    let (_, samples) = read_back(bytes);
    assert_eq!(samples, input.to_vec());
}

#[test]
fn test_convert_drops_incomplete_trailing_frame() {
    let format = PcmFormat { channels: 2, ..Default::default() };
    let (_, samples) =
        read_back(convert_pcm_to_wav(&pcm_from_samples(&[1, 2, 3]), &format).unwrap());
    assert_eq!(samples, vec![1, 2]);
}

#[test]
fn test_convert_empty_pcm_produces_header_only() {
    let bytes = convert_pcm_to_wav(&[], &PcmFormat::default()).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");

    let (_, samples) = read_back(bytes);
    assert!(samples.is_empty());
}

// =============================================================================
// File output
// =============================================================================

#[test]
fn test_save_creates_missing_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("a").join("b").join("clip.wav");

    save_pcm_to_wav(&path, &pcm_from_samples(&[5, 6, 7]), &PcmFormat::default()).unwrap();

    assert!(path.exists());
    let mut reader = hound::WavReader::open(&path).unwrap();
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![5, 6, 7]);
}

#[test]
fn test_save_matches_in_memory_encoding() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("clip.wav");
    let pcm = pcm_from_samples(&[10, -20, 30, -40]);
    let format = PcmFormat::default();

    save_pcm_to_wav(&path, &pcm, &format).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), convert_pcm_to_wav(&pcm, &format).unwrap());
}

#[test]
fn test_save_fails_when_parent_is_a_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let result = save_pcm_to_wav(
        &blocker.join("clip.wav"),
        &pcm_from_samples(&[1]),
        &PcmFormat::default(),
    );

    assert!(matches!(result, Err(WavEncodingError::IoError(_))));
}

#[test]
fn test_save_rejects_invalid_format_before_touching_disk() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("nested").join("clip.wav");
    let format = PcmFormat { sample_rate: 0, ..Default::default() };

    let result = save_pcm_to_wav(&path, &pcm_from_samples(&[1]), &format);

    assert!(matches!(result, Err(WavEncodingError::InvalidInput(_))));
    assert!(!temp_dir.path().join("nested").exists());
}

// =============================================================================
// Clip saving
// =============================================================================

#[test]
fn test_save_clip_creates_output_dir_and_returns_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let clips_dir = temp_dir.path().join("clips");
    let writer = MockClipWriter::new(clips_dir.clone());

    let path = save_clip(&pcm_from_samples(&[1, 2]), &PcmFormat::default(), "robin", &writer)
        .unwrap();

    assert_eq!(path, clips_dir.join("test-clip.wav"));
    assert!(path.exists());
    assert_eq!(*writer.created_dirs.lock().unwrap(), vec![clips_dir]);
}

#[test]
fn test_save_clip_skips_creation_for_existing_dir() {
    let temp_dir = tempfile::tempdir().unwrap();
    let writer = MockClipWriter::new(temp_dir.path().to_path_buf());

    save_clip(&pcm_from_samples(&[1]), &PcmFormat::default(), "robin", &writer).unwrap();

    assert!(writer.created_dirs.lock().unwrap().is_empty());
}

#[test]
fn test_save_clip_dir_creation_failure() {
    let temp_dir = tempfile::tempdir().unwrap();
    let writer = MockClipWriter::new(temp_dir.path().join("missing")).with_dir_creation_failure();

    let result = save_clip(&pcm_from_samples(&[1]), &PcmFormat::default(), "robin", &writer);

    assert!(matches!(result, Err(WavEncodingError::IoError(_))));
    if let Err(WavEncodingError::IoError(msg)) = result {
        assert!(msg.contains("Permission denied"));
    }
}

#[test]
fn test_save_clip_does_not_overwrite_existing_clip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let writer = MockClipWriter::new(temp_dir.path().to_path_buf());
    let format = PcmFormat::default();

    // Same generated name every time, as with two saves in one millisecond
    let first = save_clip(&pcm_from_samples(&[1, 1, 1]), &format, "robin", &writer).unwrap();
    let second = save_clip(&pcm_from_samples(&[2]), &format, "robin", &writer).unwrap();
    let third = save_clip(&pcm_from_samples(&[3]), &format, "robin", &writer).unwrap();

    assert_eq!(first, temp_dir.path().join("test-clip.wav"));
    assert_eq!(second, temp_dir.path().join("test-clip-1.wav"));
    assert_eq!(third, temp_dir.path().join("test-clip-2.wav"));

    let mut reader = hound::WavReader::open(&first).unwrap();
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![1, 1, 1], "First clip must survive later saves");
}

#[test]
fn test_validate_clip() {
    let format = PcmFormat::default();
    assert!(validate_clip(&pcm_from_samples(&[1]), &format).is_ok());
    assert!(matches!(
        validate_clip(&[], &format),
        Err(WavEncodingError::InvalidInput(_))
    ));
    assert!(matches!(
        validate_clip(&[0x01], &format),
        Err(WavEncodingError::InvalidInput(_))
    ));
    assert!(matches!(
        validate_clip(&pcm_from_samples(&[1]), &PcmFormat { channels: 0, ..format }),
        Err(WavEncodingError::InvalidInput(_))
    ));
}

#[test]
fn test_save_clip_rejects_empty_pcm() {
    let temp_dir = tempfile::tempdir().unwrap();
    let writer = MockClipWriter::new(temp_dir.path().to_path_buf());

    for pcm in [&[][..], &[0x01][..]] {
        let result = save_clip(pcm, &PcmFormat::default(), "robin", &writer);
        assert!(matches!(result, Err(WavEncodingError::InvalidInput(_))));
    }
}

#[test]
fn test_system_clip_writer_filename() {
    let writer = SystemClipWriter::new(PathBuf::from("/tmp/clips"));
    let filename = writer.generate_filename("American Robin");

    assert!(filename.starts_with("American_Robin-"));
    assert!(filename.ends_with(".wav"));
    assert_eq!(writer.output_dir(), PathBuf::from("/tmp/clips"));
}

#[test]
fn test_system_clip_writer_default_dir() {
    let writer = SystemClipWriter::with_default_dir();
    let dir = writer.output_dir();
    assert_eq!(dir, super::wav::default_clips_dir());
    assert!(dir.ends_with("birdclip/clips"));
}

#[test]
fn test_system_clip_writer_end_to_end() {
    let temp_dir = tempfile::tempdir().unwrap();
    let writer = SystemClipWriter::new(temp_dir.path().join("clips"));
    let format = PcmFormat { sample_rate: 8000, ..Default::default() };

    let path = save_clip(&pcm_from_samples(&[0; 8000]), &format, "wren", &writer).unwrap();

    assert!(path.starts_with(temp_dir.path().join("clips")));
    let duration = parse_duration_from_file(&path).unwrap();
    assert!((duration - 1.0).abs() < 1e-9);
}

#[test]
fn test_sanitize_label() {
    assert_eq!(sanitize_label("Turdus migratorius"), "Turdus_migratorius");
    assert_eq!(sanitize_label("a/b\\c:d"), "a_b_c_d");
    assert_eq!(sanitize_label("  wren  "), "wren");
    assert_eq!(sanitize_label("already-safe_name"), "already-safe_name");
    assert_eq!(sanitize_label(""), "unlabeled");
}

// =============================================================================
// Duration parsing
// =============================================================================

#[test]
fn test_parse_duration_stereo() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("stereo.wav");
    let format = PcmFormat { sample_rate: 1000, channels: 2, ..Default::default() };

    // 500 frames of two channels = 0.5s
    save_pcm_to_wav(&path, &pcm_from_samples(&[0; 1000]), &format).unwrap();

    let duration = parse_duration_from_file(&path).unwrap();
    assert!((duration - 0.5).abs() < 1e-9);
}

#[test]
fn test_parse_duration_missing_file() {
    let result = parse_duration_from_file(Path::new("/nonexistent/clip.wav"));
    assert!(matches!(result, Err(WavEncodingError::IoError(_))));
}

#[test]
fn test_parse_duration_not_a_wav() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("bogus.wav");
    std::fs::write(&path, b"definitely not a wav file").unwrap();

    let result = parse_duration_from_file(&path);
    assert!(matches!(result, Err(WavEncodingError::EncodingError(_))));
}
