// Audio clip encoding for detection audio

pub mod wav;
pub use wav::{
    convert_pcm_to_wav, default_clips_dir, parse_duration_from_file, save_clip, save_pcm_to_wav,
    validate_clip, ClipWriter, PcmFormat, SystemClipWriter, WavEncodingError,
};

#[cfg(test)]
mod wav_test;
