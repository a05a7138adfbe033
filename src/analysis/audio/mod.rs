//! Turning audio files into mono signals at the analysis rate.

mod downmix;
mod resample;

use std::path::Path;

use super::audio_decode::{DecodeError, decode_audio};

pub(crate) use downmix::downmix_to_mono;
pub use resample::ResampleError;
pub(crate) use resample::resample;

/// Rate every file is brought to before feature extraction.
pub const TARGET_SAMPLE_RATE: u32 = 32_000;

/// Decoded mono audio ready for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoAudio {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    /// Rate of the file before resampling.
    pub source_sample_rate: u32,
    pub source_channels: u16,
}

impl MonoAudio {
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Decode `path`, average its channels and resample to `sample_rate`.
pub fn load_mono(path: &Path, sample_rate: u32) -> Result<MonoAudio, DecodeError> {
    let decoded = decode_audio(path)?;
    let mono = downmix_to_mono(&decoded.samples, decoded.channels);
    let samples = resample(&mono, decoded.sample_rate, sample_rate).map_err(|source| {
        DecodeError::Resample {
            path: path.to_path_buf(),
            source,
        }
    })?;
    if decoded.sample_rate != sample_rate {
        tracing::debug!(
            "Resampled {} from {} Hz to {} Hz",
            path.display(),
            decoded.sample_rate,
            sample_rate
        );
    }
    Ok(MonoAudio {
        samples,
        sample_rate: sample_rate.max(1),
        source_sample_rate: decoded.sample_rate,
        source_channels: decoded.channels,
    })
}
