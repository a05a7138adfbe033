use crate::analysis::fft::hamming_window;
use crate::matrix::Matrix;

/// Splits a signal into non-overlapping Hamming-windowed frames, zero-padding the tail.
#[derive(Debug, Clone)]
pub(crate) struct FrameExtractor {
    frame_length: usize,
    window: Vec<f64>,
}

impl FrameExtractor {
    pub(crate) fn new(frame_length: usize) -> Self {
        Self {
            frame_length,
            window: hamming_window(frame_length),
        }
    }

    pub(crate) fn frame_length(&self) -> usize {
        self.frame_length
    }

    /// `ceil(len / frame_length)`.
    pub(crate) fn frame_count(&self, signal_len: usize) -> usize {
        signal_len.div_ceil(self.frame_length.max(1))
    }

    /// Windowed copy of frame `index`; samples past the signal end read as zero.
    pub(crate) fn windowed_frame(&self, signal: &[f64], index: usize) -> Vec<f64> {
        let start = index * self.frame_length;
        self.window
            .iter()
            .enumerate()
            .map(|(i, &w)| signal.get(start + i).copied().unwrap_or(0.0) * w)
            .collect()
    }

    /// `(frames x frame_length)` matrix of windowed frames.
    pub(crate) fn frame_matrix(&self, signal: &[f64]) -> Matrix {
        let frames = self.frame_count(signal.len());
        let mut matrix = Matrix::zeros(frames, self.frame_length);
        for index in 0..frames {
            matrix
                .row_mut(index)
                .copy_from_slice(&self.windowed_frame(signal, index));
        }
        matrix
    }
}

/// Samples per frame for a duration, rounding half to even.
pub(crate) fn frame_length_for(duration_seconds: f64, sample_rate: u32) -> usize {
    let samples = (duration_seconds * sample_rate as f64).round_ties_even();
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}
