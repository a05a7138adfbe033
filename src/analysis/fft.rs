use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Symmetric Hamming window, `0.54 - 0.46 cos(2 pi n / (M - 1))`.
pub(crate) fn hamming_window(length: usize) -> Vec<f64> {
    if length <= 1 {
        return vec![1.0_f64; length];
    }
    let denom = (length - 1) as f64;
    (0..length)
        .map(|n| 0.54 - 0.46 * (2.0 * PI * n as f64 / denom).cos())
        .collect()
}

/// Planned forward FFT returning magnitude spectra of real frames.
///
/// Frames shorter than the FFT length are zero-padded, longer frames are truncated.
#[derive(Clone)]
pub(crate) struct MagnitudeSpectrum {
    len: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl MagnitudeSpectrum {
    pub(crate) fn new(len: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            len,
            fft: planner.plan_fft_forward(len),
        }
    }

    /// `|FFT(frame)|` for all `len` bins.
    pub(crate) fn magnitudes(&self, frame: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = (0..self.len)
            .map(|i| Complex::new(frame.get(i).copied().unwrap_or(0.0), 0.0))
            .collect();
        self.fft.process(&mut buffer);
        buffer.iter().map(|bin| bin.norm()).collect()
    }
}

impl fmt::Debug for MagnitudeSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagnitudeSpectrum")
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_window_is_symmetric_with_raised_edges() {
        let w = hamming_window(8);
        assert!((w[0] - 0.08).abs() < 1e-12);
        assert!((w[7] - 0.08).abs() < 1e-12);
        assert!((w[1] - w[6]).abs() < 1e-12);
        assert_eq!(hamming_window(1), vec![1.0]);
        assert!(hamming_window(0).is_empty());
    }

    #[test]
    fn hamming_window_matches_known_samples() {
        let w = hamming_window(1024);
        assert!((w[1] - 0.080009).abs() < 1e-6);
        assert!((w[511] - 0.999998).abs() < 1e-6);
    }

    #[test]
    fn constant_frame_puts_all_energy_in_dc() {
        let spectrum = MagnitudeSpectrum::new(8);
        let mags = spectrum.magnitudes(&[1.0; 8]);
        assert!((mags[0] - 8.0).abs() < 1e-9);
        assert!(mags[1..].iter().all(|&m| m.abs() < 1e-9));
    }

    #[test]
    fn short_frames_are_zero_padded() {
        let spectrum = MagnitudeSpectrum::new(16);
        let mags = spectrum.magnitudes(&[1.0]);
        assert_eq!(mags.len(), 16);
        assert!(mags.iter().all(|&m| (m - 1.0).abs() < 1e-12));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let len = 64;
        let frame: Vec<f64> = (0..len)
            .map(|n| (2.0 * PI * 4.0 * n as f64 / len as f64).sin())
            .collect();
        let mags = MagnitudeSpectrum::new(len).magnitudes(&frame);
        let peak = (0..len / 2)
            .max_by(|&a, &b| mags[a].total_cmp(&mags[b]))
            .unwrap();
        assert_eq!(peak, 4);
    }
}
