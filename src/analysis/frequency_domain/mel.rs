//! Triangular filterbank construction on the Mel and hybrid Mel-linear scales.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::Matrix;

/// Number of linearly spaced edges at the bottom of the hybrid scale.
pub const HYBRID_LINEAR_BANDS: usize = 10;
/// Allowed distance (Hz) between the last hybrid edge and the requested upper frequency.
pub const HYBRID_TOLERANCE_HZ: f64 = 1e-3;
/// Bisection steps before the hybrid search gives up.
pub const HYBRID_MAX_ITERATIONS: usize = 1000;

/// Frequency scale used to place the filter edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    /// Edges uniformly spaced in Mel.
    Mel,
    /// Ten linear edges followed by a uniform Mel run.
    HybridMelLinear,
}

impl TryFrom<u8> for ScaleType {
    type Error = FilterbankError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Mel),
            1 => Ok(Self::HybridMelLinear),
            other => Err(FilterbankError::InvalidScale(other)),
        }
    }
}

/// Per-band gain applied to the triangle ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Peak weight of 1.
    None,
    /// Gain `2 / (f[right] - f[left])` so every triangle has unit area in Hz.
    Area,
}

impl TryFrom<u8> for Normalization {
    type Error = FilterbankError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Area),
            other => Err(FilterbankError::InvalidNormalization(other)),
        }
    }
}

/// Errors raised while building a filterbank. No partial filterbank is ever returned.
#[derive(Debug, Error, PartialEq)]
pub enum FilterbankError {
    #[error("Invalid scale type {0}; use 0 for Mel or 1 for hybrid Mel-linear")]
    InvalidScale(u8),
    #[error("Invalid normalization type {0}; use 0 for none or 1 for area normalization")]
    InvalidNormalization(u8),
    #[error("Filterbank needs at least one band")]
    NoBands,
    #[error("Frequency axis is empty")]
    EmptyAxis,
    #[error("Invalid frequency range {low_hz} Hz..{high_hz} Hz")]
    InvalidRange { low_hz: f64, high_hz: f64 },
    #[error("Hybrid Mel-linear scale needs at least {min} bands, got {bands}")]
    TooFewBands { bands: usize, min: usize },
    #[error(
        "Hybrid Mel-linear step search did not converge after {iterations} iterations \
         (last edge {last_hz:.4} Hz, target {target_hz:.4} Hz)"
    )]
    NoConvergence {
        iterations: usize,
        last_hz: f64,
        target_hz: f64,
    },
}

/// Parameters for one filterbank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterbankConfig {
    pub low_hz: f64,
    pub high_hz: f64,
    pub bands: usize,
    pub sample_rate: u32,
    pub scale: ScaleType,
    pub normalization: Normalization,
}

/// Triangular filter weights over a frequency axis plus the edge indices they were built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Filterbank {
    weights: Matrix,
    edge_indices: Vec<usize>,
}

impl Filterbank {
    pub fn bands(&self) -> usize {
        self.weights.rows()
    }

    /// `(bands x axis_len)` weight matrix.
    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    /// All `bands + 2` left/center/right edge indices.
    pub fn edge_indices(&self) -> &[usize] {
        &self.edge_indices
    }

    /// Peak index of every band.
    pub fn center_indices(&self) -> &[usize] {
        &self.edge_indices[1..=self.bands()]
    }

    /// Project a spectrum sampled on the same axis onto the bands.
    pub fn apply(&self, spectrum: &[f64]) -> Vec<f64> {
        self.weights.mul_vec(spectrum)
    }
}

impl FilterbankConfig {
    /// Build the filterbank over `axis` (Hz, increasing).
    pub fn build(&self, axis: &[f64]) -> Result<Filterbank, FilterbankError> {
        if self.bands == 0 {
            return Err(FilterbankError::NoBands);
        }
        if axis.is_empty() {
            return Err(FilterbankError::EmptyAxis);
        }
        if !(self.low_hz.is_finite() && self.high_hz.is_finite())
            || self.low_hz < 0.0
            || self.high_hz <= self.low_hz
        {
            return Err(FilterbankError::InvalidRange {
                low_hz: self.low_hz,
                high_hz: self.high_hz,
            });
        }
        let edges_hz = match self.scale {
            ScaleType::Mel => mel_edges(self.low_hz, self.high_hz, self.bands),
            ScaleType::HybridMelLinear => hybrid_edges(self.low_hz, self.high_hz, self.bands)?,
        };
        let edge_indices = edge_indices(&edges_hz, axis);
        let weights = triangles(&edge_indices, axis, self.bands, self.normalization);
        tracing::debug!(
            "Built {:?} filterbank: {} bands over {} bins ({}..{} Hz, fs {} Hz)",
            self.scale,
            self.bands,
            axis.len(),
            self.low_hz,
            self.high_hz,
            self.sample_rate
        );
        Ok(Filterbank {
            weights,
            edge_indices,
        })
    }
}

/// Build a filterbank from raw scale/normalization codes (0/1 each).
pub fn build_filterbank(
    low_hz: f64,
    high_hz: f64,
    bands: usize,
    axis: &[f64],
    sample_rate: u32,
    scale_code: u8,
    normalization_code: u8,
) -> Result<Filterbank, FilterbankError> {
    FilterbankConfig {
        low_hz,
        high_hz,
        bands,
        sample_rate,
        scale: ScaleType::try_from(scale_code)?,
        normalization: Normalization::try_from(normalization_code)?,
    }
    .build(axis)
}

pub fn hz_to_mel(hz: f64) -> f64 {
    1125.0 * (1.0 + hz / 700.0).ln()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * ((mel / 1125.0).exp() - 1.0)
}

/// `num` evenly spaced values from `start` to `stop` inclusive; the last value is exactly `stop`.
pub(crate) fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut out: Vec<f64> = (0..num).map(|i| i as f64 * step + start).collect();
            out[num - 1] = stop;
            out
        }
    }
}

/// `num` evenly spaced values from `start` towards `stop`, excluding `stop`.
fn half_open_ramp(start: f64, stop: f64, num: usize) -> impl Iterator<Item = f64> {
    let step = if num == 0 {
        0.0
    } else {
        (stop - start) / num as f64
    };
    (0..num).map(move |i| i as f64 * step + start)
}

fn mel_edges(low_hz: f64, high_hz: f64, bands: usize) -> Vec<f64> {
    linspace(hz_to_mel(low_hz), hz_to_mel(high_hz), bands + 2)
        .into_iter()
        .map(mel_to_hz)
        .collect()
}

fn hybrid_edges(low_hz: f64, high_hz: f64, bands: usize) -> Result<Vec<f64>, FilterbankError> {
    bisect_hybrid_edges(low_hz, high_hz, bands, HYBRID_MAX_ITERATIONS)
}

/// Bisect the linear step until the Mel-extended run ends on `high_hz`.
fn bisect_hybrid_edges(
    low_hz: f64,
    high_hz: f64,
    bands: usize,
    max_iterations: usize,
) -> Result<Vec<f64>, FilterbankError> {
    if bands < HYBRID_LINEAR_BANDS {
        return Err(FilterbankError::TooFewBands {
            bands,
            min: HYBRID_LINEAR_BANDS,
        });
    }
    let mut step = (high_hz - low_hz) / bands as f64;
    let mut lower = 0.0_f64;
    let mut upper = high_hz;
    let mut last_hz = f64::NAN;
    for iteration in 0..max_iterations {
        let edges = hybrid_candidate(low_hz, step, bands);
        last_hz = edges[edges.len() - 1];
        if last_hz > high_hz {
            upper = step;
            step = (step + lower) / 2.0;
        } else {
            lower = step;
            step = (step + upper) / 2.0;
        }
        if (last_hz - high_hz).abs() <= HYBRID_TOLERANCE_HZ {
            tracing::debug!(
                "Hybrid scale converged after {} iterations (last edge {:.4} Hz)",
                iteration + 1,
                last_hz
            );
            return Ok(edges);
        }
    }
    Err(FilterbankError::NoConvergence {
        iterations: max_iterations,
        last_hz,
        target_hz: high_hz,
    })
}

/// Nine linear edges, then a uniform Mel run starting at the tenth linear point.
fn hybrid_candidate(low_hz: f64, step: f64, bands: usize) -> Vec<f64> {
    let linear: Vec<f64> = (0..HYBRID_LINEAR_BANDS)
        .map(|i| i as f64 * step + low_hz)
        .collect();
    let anchor = hz_to_mel(linear[HYBRID_LINEAR_BANDS - 1]);
    let spacing = anchor - hz_to_mel(linear[HYBRID_LINEAR_BANDS - 2]);
    // 9 linear + this run must give `bands + 2` edges; one fewer overruns the last triangle.
    let mel_points = bands + 3 - HYBRID_LINEAR_BANDS;
    let mut edges = Vec::with_capacity(bands + 2);
    edges.extend_from_slice(&linear[..HYBRID_LINEAR_BANDS - 1]);
    edges.extend((0..mel_points).map(|i| mel_to_hz(i as f64 * spacing + anchor)));
    edges
}

/// First axis index at or above each target; targets past the axis clamp to the last index.
fn edge_indices(edges_hz: &[f64], axis: &[f64]) -> Vec<usize> {
    let last = axis.len() - 1;
    edges_hz
        .iter()
        .map(|&target| {
            axis.iter()
                .position(|&freq| freq >= target)
                .unwrap_or(last)
        })
        .collect()
}

fn triangles(
    edge_indices: &[usize],
    axis: &[f64],
    bands: usize,
    normalization: Normalization,
) -> Matrix {
    let mut weights = Matrix::zeros(bands, axis.len());
    for band in 0..bands {
        let left = edge_indices[band];
        let center = edge_indices[band + 1];
        let right = edge_indices[band + 2];
        if right <= left {
            continue;
        }
        let gain = match normalization {
            Normalization::None => 1.0,
            Normalization::Area => 2.0 / (axis[right] - axis[left]),
        };
        let row = weights.row_mut(band);
        for (cell, ramp) in row[left..center]
            .iter_mut()
            .zip(half_open_ramp(0.0, 1.0, center - left))
        {
            *cell = gain * ramp;
        }
        for (cell, ramp) in row[center..right]
            .iter_mut()
            .zip(half_open_ramp(1.0, 0.0, right - center))
        {
            *cell = gain * ramp;
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 32_000;

    fn axis() -> Vec<f64> {
        linspace(0.0, FS as f64 / 2.0, 512)
    }

    fn config(scale: ScaleType, normalization: Normalization) -> FilterbankConfig {
        FilterbankConfig {
            low_hz: 300.0,
            high_hz: FS as f64 / 2.0,
            bands: 41,
            sample_rate: FS,
            scale,
            normalization,
        }
    }

    #[test]
    fn mel_round_trip_is_stable() {
        for hz in [0.0, 300.0, 1_000.0, 16_000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-9);
        }
    }

    #[test]
    fn linspace_pins_both_endpoints() {
        let values = linspace(0.0, 16_000.0, 512);
        assert_eq!(values.len(), 512);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[511], 16_000.0);
        assert!((values[1] - 16_000.0 / 511.0).abs() < 1e-12);
    }

    #[test]
    fn mel_edges_land_on_expected_bins() {
        let bank = config(ScaleType::Mel, Normalization::Area)
            .build(&axis())
            .unwrap();
        let edges = bank.edge_indices();
        assert_eq!(edges.len(), 43);
        assert_eq!(&edges[..6], &[10, 12, 15, 17, 20, 23]);
        assert_eq!(&edges[38..], &[386, 414, 445, 477, 511]);
        assert_eq!(bank.center_indices().len(), 41);
        assert_eq!(bank.center_indices()[0], 12);
    }

    #[test]
    fn mel_edges_are_non_decreasing_for_many_configurations() {
        let axis = axis();
        for bands in [1, 5, 20, 41, 80] {
            for low in [0.0, 100.0, 300.0, 2_000.0] {
                let mut cfg = config(ScaleType::Mel, Normalization::None);
                cfg.bands = bands;
                cfg.low_hz = low;
                let bank = cfg.build(&axis).unwrap();
                let edges = bank.edge_indices();
                assert_eq!(edges.len(), bands + 2);
                assert!(edges.windows(2).all(|pair| pair[0] <= pair[1]));
            }
        }
    }

    #[test]
    fn unnormalized_triangles_peak_at_one_on_center() {
        let bank = config(ScaleType::Mel, Normalization::None)
            .build(&axis())
            .unwrap();
        for band in 0..bank.bands() {
            let edges = bank.edge_indices();
            let (left, center, right) = (edges[band], edges[band + 1], edges[band + 2]);
            let row = bank.weights().row(band);
            if right > center {
                assert_eq!(row[center], 1.0);
            }
            if center > left {
                assert_eq!(row[left], 0.0);
            }
            assert!(row[right..].iter().all(|&w| w == 0.0));
            assert!(row.iter().all(|&w| (0.0..=1.0).contains(&w)));
        }
    }

    #[test]
    fn area_normalized_band_sums_match_ramp_lengths() {
        let axis = axis();
        let bank = config(ScaleType::Mel, Normalization::Area)
            .build(&axis)
            .unwrap();
        let edges = bank.edge_indices();
        for band in 0..bank.bands() {
            let (left, center, right) = (edges[band], edges[band + 1], edges[band + 2]);
            let len1 = (center - left) as f64;
            let len2 = (right - center) as f64;
            let gain = 2.0 / (axis[right] - axis[left]);
            let rising = if len1 > 0.0 { (len1 - 1.0) / 2.0 } else { 0.0 };
            let falling = if len2 > 0.0 { (len2 + 1.0) / 2.0 } else { 0.0 };
            let expected = gain * (rising + falling);
            let sum: f64 = bank.weights().row(band).iter().sum();
            assert!(
                (sum - expected).abs() < 1e-12,
                "band {band}: sum {sum} expected {expected}"
            );
        }
    }

    #[test]
    fn out_of_range_targets_clamp_to_last_index() {
        let axis = [0.0, 10.0, 20.0];
        assert_eq!(edge_indices(&[-1.0, 10.0, 15.0, 25.0], &axis), vec![0, 1, 2, 2]);
    }

    #[test]
    fn hybrid_scale_converges_on_upper_frequency() {
        let edges = hybrid_edges(300.0, 16_000.0, 41).unwrap();
        assert_eq!(edges.len(), 43);
        assert!((edges[42] - 16_000.0).abs() <= HYBRID_TOLERANCE_HZ);
        let step = edges[1] - edges[0];
        for pair in edges[..HYBRID_LINEAR_BANDS].windows(2) {
            assert!((pair[1] - pair[0] - step).abs() < 1e-9);
        }
        assert!(edges.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn hybrid_filterbank_builds_with_area_normalization() {
        let bank = config(ScaleType::HybridMelLinear, Normalization::Area)
            .build(&axis())
            .unwrap();
        assert_eq!(bank.edge_indices().len(), 43);
        assert_eq!(bank.weights().shape(), (41, 512));
    }

    #[test]
    fn hybrid_scale_rejects_too_few_bands() {
        let mut cfg = config(ScaleType::HybridMelLinear, Normalization::None);
        cfg.bands = 9;
        assert_eq!(
            cfg.build(&axis()),
            Err(FilterbankError::TooFewBands { bands: 9, min: 10 })
        );
    }

    #[test]
    fn hybrid_search_reports_iteration_cap() {
        match bisect_hybrid_edges(300.0, 16_000.0, 41, 1) {
            Err(FilterbankError::NoConvergence {
                iterations,
                last_hz,
                target_hz,
            }) => {
                assert_eq!(iterations, 1);
                assert_eq!(target_hz, 16_000.0);
                assert!(last_hz.is_finite());
                assert!((last_hz - 16_000.0).abs() > HYBRID_TOLERANCE_HZ);
            }
            other => panic!("expected NoConvergence, got {other:?}"),
        }
        assert!(bisect_hybrid_edges(300.0, 16_000.0, 41, HYBRID_MAX_ITERATIONS).is_ok());
    }

    #[test]
    fn invalid_codes_are_configuration_errors() {
        let axis = axis();
        assert_eq!(
            build_filterbank(300.0, 16_000.0, 41, &axis, FS, 2, 1),
            Err(FilterbankError::InvalidScale(2))
        );
        assert_eq!(
            build_filterbank(300.0, 16_000.0, 41, &axis, FS, 0, 7),
            Err(FilterbankError::InvalidNormalization(7))
        );
        assert!(build_filterbank(300.0, 16_000.0, 41, &axis, FS, 1, 0).is_ok());
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let mut cfg = config(ScaleType::Mel, Normalization::None);
        assert_eq!(cfg.build(&[]), Err(FilterbankError::EmptyAxis));
        cfg.bands = 0;
        assert_eq!(cfg.build(&axis()), Err(FilterbankError::NoBands));
    }
}
