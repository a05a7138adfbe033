//! Detection pipeline: MFCC+delta features -> network -> thresholded frame count.

mod aggregate;

use std::ops::Range;

use thiserror::Error;

use crate::analysis::frequency_domain::{
    CepstralFeatures, ExtractError, MfccExtractor, frame_length_for,
};
use crate::matrix::Matrix;
use crate::ml::network::{INPUT_SIZE, TwoLayerNetwork};

pub use aggregate::{
    BlockVotes, DetectionSegment, DetectionSummary, block_votes, count_detections,
    detection_segments,
};

/// Rate every signal is resampled to before analysis.
pub const SAMPLE_RATE: u32 = 32_000;
pub const FRAME_LENGTH: usize = 1024;
/// Frame duration the network was trained with (1024 samples at 32 kHz).
pub const FRAME_DURATION_SECONDS: f64 = FRAME_LENGTH as f64 / SAMPLE_RATE as f64;
pub const BANDS: usize = 41;
pub const DEFAULT_THRESHOLD: f64 = 0.5;
/// Frames per vote block (16 frames of 1024 samples, ~0.5 s).
pub const DEFAULT_BLOCK_FRAMES: usize = 16;
/// Cepstral rows fed to the network; row 0 (frame energy) is dropped.
pub const COEFFICIENT_ROWS: Range<usize> = 1..13;

#[derive(Debug, Error, PartialEq)]
pub enum DetectorError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Detector needs at least {needed} filterbank bands, got {bands}")]
    TooFewBands { bands: usize, needed: usize },
    #[error("Detection threshold must be finite, got {0}")]
    InvalidThreshold(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    pub sample_rate: u32,
    pub frame_length: usize,
    pub bands: usize,
    pub threshold: f64,
    pub block_frames: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            frame_length: FRAME_LENGTH,
            bands: BANDS,
            threshold: DEFAULT_THRESHOLD,
            block_frames: DEFAULT_BLOCK_FRAMES,
        }
    }
}

impl DetectorSettings {
    pub fn frame_duration_seconds(&self) -> f64 {
        self.frame_length as f64 / self.sample_rate.max(1) as f64
    }
}

/// Owns the filterbank-bearing extractor and the network; both are read-only after
/// construction, so one detector can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct Detector {
    settings: DetectorSettings,
    extractor: MfccExtractor,
    network: TwoLayerNetwork,
}

impl Detector {
    pub fn new(settings: DetectorSettings, network: TwoLayerNetwork) -> Result<Self, DetectorError> {
        if !settings.threshold.is_finite() {
            return Err(DetectorError::InvalidThreshold(settings.threshold));
        }
        if settings.bands < COEFFICIENT_ROWS.end {
            return Err(DetectorError::TooFewBands {
                bands: settings.bands,
                needed: COEFFICIENT_ROWS.end,
            });
        }
        let extractor = MfccExtractor::new(
            settings.bands,
            settings.frame_duration_seconds(),
            settings.sample_rate,
        )?;
        tracing::debug!(
            "Detector ready: {} Hz, {} samples/frame, {} bands, threshold {}",
            settings.sample_rate,
            extractor.frame_length(),
            settings.bands,
            settings.threshold
        );
        Ok(Self {
            settings,
            extractor,
            network,
        })
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    pub fn extractor(&self) -> &MfccExtractor {
        &self.extractor
    }

    pub fn network(&self) -> &TwoLayerNetwork {
        &self.network
    }

    /// Stack MFCC rows 1..13 on delta rows 1..13 into the `(24 x frames)` network input.
    pub fn network_input(&self, features: &CepstralFeatures) -> Matrix {
        let mfcc = features.mfcc().select_rows(COEFFICIENT_ROWS);
        let delta = features.delta().select_rows(COEFFICIENT_ROWS);
        let input = mfcc.vstack(&delta);
        debug_assert_eq!(input.rows(), INPUT_SIZE);
        input
    }

    /// Positive-class score for every frame of `signal`.
    pub fn frame_scores(&self, signal: &[f64]) -> Vec<f64> {
        let features = self.extractor.extract(signal);
        self.network.positive_scores(&self.network_input(&features))
    }

    /// Number of frames scoring above the configured threshold.
    pub fn process_signal(&self, signal: &[f64]) -> usize {
        count_detections(&self.frame_scores(signal), self.settings.threshold)
    }

    pub fn analyze_signal(&self, signal: &[f64]) -> DetectionSummary {
        DetectionSummary::from_scores(
            self.frame_scores(signal),
            self.settings.threshold,
            self.extractor.frame_length() as f64 / self.settings.sample_rate as f64,
            self.settings.block_frames,
        )
    }
}

/// Count detections in a signal sampled at `sample_rate` with the compiled-in weights.
///
/// Frames keep the trained duration (1024 / 32000 s), rounded to whole samples at
/// `sample_rate`.
pub fn process_signal(
    signal: &[f64],
    sample_rate: u32,
    threshold: f64,
) -> Result<usize, DetectorError> {
    let settings = DetectorSettings {
        sample_rate,
        frame_length: frame_length_for(FRAME_DURATION_SECONDS, sample_rate),
        threshold,
        ..DetectorSettings::default()
    };
    let detector = Detector::new(settings, TwoLayerNetwork::default())?;
    Ok(detector.process_signal(signal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::network::NetworkWeights;
    use std::f64::consts::PI;

    fn silence(seconds: f64) -> Vec<f64> {
        vec![0.0; (seconds * SAMPLE_RATE as f64) as usize]
    }

    #[test]
    fn silence_scores_below_default_threshold() {
        assert_eq!(process_signal(&silence(2.0), SAMPLE_RATE, 0.5), Ok(0));
    }

    #[test]
    fn silence_scores_pin_the_bias_only_output() {
        let detector = Detector::new(DetectorSettings::default(), TwoLayerNetwork::default())
            .unwrap();
        let scores = detector.frame_scores(&silence(2.0));
        assert_eq!(scores.len(), 63);
        for score in &scores {
            assert!((score - 0.473_642_308_059_237).abs() < 1e-9);
        }
        assert_eq!(process_signal(&silence(2.0), SAMPLE_RATE, 0.4), Ok(63));
    }

    #[test]
    fn two_partial_signal_pins_frame_scores() {
        let fs = SAMPLE_RATE as f64;
        let signal: Vec<f64> = (0..5_000)
            .map(|n| {
                let t = n as f64;
                0.3 * (2.0 * PI * 2_500.0 * t / fs).sin()
                    + 0.1 * (2.0 * PI * 7_000.0 * t / fs + 0.3).sin() * (t / 5_000.0)
            })
            .collect();
        let detector = Detector::new(DetectorSettings::default(), TwoLayerNetwork::default())
            .unwrap();
        let expected = [
            0.206_852_471,
            0.183_270_19,
            0.171_756_457,
            0.164_807_432,
            0.068_971_166,
        ];
        let scores = detector.frame_scores(&signal);
        assert_eq!(scores.len(), expected.len());
        for (score, expected) in scores.iter().zip(expected) {
            assert!((score - expected).abs() < 1e-8, "{score} != {expected}");
        }
        assert_eq!(process_signal(&signal, SAMPLE_RATE, 0.18), Ok(2));
    }

    #[test]
    fn network_input_stacks_selected_rows() {
        let detector = Detector::new(DetectorSettings::default(), TwoLayerNetwork::default())
            .unwrap();
        let signal: Vec<f64> = (0..5_000).map(|n| ((n as f64) * 0.37).sin() * 0.2).collect();
        let features = detector.extractor().extract(&signal);
        let input = detector.network_input(&features);
        assert_eq!(input.shape(), (INPUT_SIZE, features.frames()));
        assert_eq!(input.row(0), features.mfcc().row(1));
        assert_eq!(input.row(11), features.mfcc().row(12));
        assert_eq!(input.row(12), features.delta().row(1));
        assert_eq!(input.row(23), features.delta().row(12));
    }

    #[test]
    fn analyze_matches_process_count() {
        let detector = Detector::new(
            DetectorSettings {
                threshold: 0.45,
                ..DetectorSettings::default()
            },
            TwoLayerNetwork::default(),
        )
        .unwrap();
        let signal: Vec<f64> = (0..40_000).map(|n| ((n as f64) * 0.11).sin() * 0.5).collect();
        let summary = detector.analyze_signal(&signal);
        assert_eq!(summary.detections, detector.process_signal(&signal));
        assert_eq!(summary.frames, 40);
        assert_eq!(summary.blocks.blocks, 3);
        assert!((summary.frame_duration_seconds - 0.032).abs() < 1e-12);
    }

    #[test]
    fn replacement_weights_change_scores() {
        let mut weights = NetworkWeights::default();
        weights.b2 = vec![10.0, -10.0];
        let network = TwoLayerNetwork::from_weights(&weights).unwrap();
        let detector = Detector::new(DetectorSettings::default(), network).unwrap();
        assert_eq!(detector.process_signal(&silence(1.0)), 32);
    }

    #[test]
    fn empty_signal_counts_nothing() {
        assert_eq!(process_signal(&[], SAMPLE_RATE, 0.0), Ok(0));
    }

    #[test]
    fn configuration_errors_surface() {
        let too_few = DetectorSettings {
            bands: 12,
            ..DetectorSettings::default()
        };
        assert_eq!(
            Detector::new(too_few, TwoLayerNetwork::default()).unwrap_err(),
            DetectorError::TooFewBands {
                bands: 12,
                needed: 13
            }
        );
        assert!(matches!(
            process_signal(&[0.0], SAMPLE_RATE, f64::NAN),
            Err(DetectorError::InvalidThreshold(_))
        ));
    }
}
