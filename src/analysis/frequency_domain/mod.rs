//! Frequency-domain feature extraction (framed MFCCs + deltas).

mod dct;
mod delta;
mod frames;
pub mod mel;

use thiserror::Error;

use crate::analysis::fft::MagnitudeSpectrum;
use crate::matrix::Matrix;

use dct::dct_ii_orthonormal;
use frames::FrameExtractor;

pub(crate) use frames::frame_length_for;

pub use delta::DELTA_HALF_WINDOW;
pub use mel::{
    Filterbank, FilterbankConfig, FilterbankError, Normalization, ScaleType, build_filterbank,
};

/// Points per FFT; frames are truncated or zero-padded to this length.
pub const FFT_SIZE: usize = 1024;
/// Magnitude bins 1..=512 feed the filterbank; DC is dropped.
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;
/// Lower edge of the extraction filterbank.
pub const FILTERBANK_LOW_HZ: f64 = 300.0;
/// Added to band energies before `log10`.
pub const LOG_ENERGY_FLOOR: f64 = 1e-10;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error(transparent)]
    Filterbank(#[from] FilterbankError),
    #[error("Sample rate must be positive")]
    ZeroSampleRate,
    #[error("Frame duration {duration_seconds} s at {sample_rate} Hz yields an empty frame")]
    EmptyFrame {
        duration_seconds: f64,
        sample_rate: u32,
    },
}

/// MFCC and delta matrices of one signal, both `(coefficients x frames)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CepstralFeatures {
    mfcc: Matrix,
    delta: Matrix,
}

impl CepstralFeatures {
    pub fn mfcc(&self) -> &Matrix {
        &self.mfcc
    }

    pub fn delta(&self) -> &Matrix {
        &self.delta
    }

    pub fn coefficients(&self) -> usize {
        self.mfcc.rows()
    }

    pub fn frames(&self) -> usize {
        self.mfcc.cols()
    }

    pub fn into_parts(self) -> (Matrix, Matrix) {
        (self.mfcc, self.delta)
    }
}

/// Frequency axis the extraction filterbank is laid out on: `linspace(0, fs/2, 512)`.
///
/// This is not the FFT bin spacing (`fs / 1024`); the network weights were trained against
/// this axis so it is kept as is.
pub fn filterbank_axis(sample_rate: u32) -> Vec<f64> {
    mel::linspace(0.0, sample_rate as f64 / 2.0, SPECTRUM_BINS)
}

/// Reusable MFCC+delta extractor holding the filterbank, window and FFT plan.
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    sample_rate: u32,
    frames: FrameExtractor,
    spectrum: MagnitudeSpectrum,
    filterbank: Filterbank,
}

impl MfccExtractor {
    /// Extractor for frames of `frame_duration_seconds` (rounded to whole samples).
    pub fn new(
        bands: usize,
        frame_duration_seconds: f64,
        sample_rate: u32,
    ) -> Result<Self, ExtractError> {
        if sample_rate == 0 {
            return Err(ExtractError::ZeroSampleRate);
        }
        let frame_length = frame_length_for(frame_duration_seconds, sample_rate);
        if frame_length == 0 {
            return Err(ExtractError::EmptyFrame {
                duration_seconds: frame_duration_seconds,
                sample_rate,
            });
        }
        let filterbank = FilterbankConfig {
            low_hz: FILTERBANK_LOW_HZ,
            high_hz: sample_rate as f64 / 2.0,
            bands,
            sample_rate,
            scale: ScaleType::Mel,
            normalization: Normalization::Area,
        }
        .build(&filterbank_axis(sample_rate))?;
        Ok(Self {
            sample_rate,
            frames: FrameExtractor::new(frame_length),
            spectrum: MagnitudeSpectrum::new(FFT_SIZE),
            filterbank,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_length(&self) -> usize {
        self.frames.frame_length()
    }

    pub fn bands(&self) -> usize {
        self.filterbank.bands()
    }

    pub fn filterbank(&self) -> &Filterbank {
        &self.filterbank
    }

    /// Number of frames a signal of `signal_len` samples produces.
    pub fn frame_count(&self, signal_len: usize) -> usize {
        self.frames.frame_count(signal_len)
    }

    /// Padded, windowed `(frames x frame_length)` view of the signal.
    pub fn frame_matrix(&self, signal: &[f64]) -> Matrix {
        self.frames.frame_matrix(signal)
    }

    pub fn extract(&self, signal: &[f64]) -> CepstralFeatures {
        let frame_count = self.frames.frame_count(signal.len());
        let mut mfcc = Matrix::zeros(frame_count, self.bands());
        for index in 0..frame_count {
            let frame = self.frames.windowed_frame(signal, index);
            mfcc.row_mut(index).copy_from_slice(&self.cepstrum(&frame));
        }
        let delta = delta::deltas(&mfcc, DELTA_HALF_WINDOW);
        tracing::trace!(
            "Extracted {} frames of {} coefficients from {} samples",
            frame_count,
            self.bands(),
            signal.len()
        );
        CepstralFeatures {
            mfcc: mfcc.transpose(),
            delta: delta.transpose(),
        }
    }

    fn cepstrum(&self, frame: &[f64]) -> Vec<f64> {
        let magnitudes = self.spectrum.magnitudes(frame);
        let energies = self.filterbank.apply(&magnitudes[1..=SPECTRUM_BINS]);
        let log_energies: Vec<f64> = energies
            .into_iter()
            .map(|energy| (energy + LOG_ENERGY_FLOOR).log10())
            .collect();
        dct_ii_orthonormal(&log_energies)
    }
}

/// One-shot extraction; builds the filterbank for this call.
pub fn extract_mfcc_and_delta(
    signal: &[f64],
    bands: usize,
    frame_duration_seconds: f64,
    sample_rate: u32,
) -> Result<CepstralFeatures, ExtractError> {
    Ok(MfccExtractor::new(bands, frame_duration_seconds, sample_rate)?.extract(signal))
}
