use crate::matrix::Matrix;

/// Half-width of the regression window used for delta coefficients.
pub const DELTA_HALF_WINDOW: usize = 2;

/// First-order deltas over frames of a `(frames x coefficients)` matrix.
///
/// `delta[t] = sum_{i=1..N} i * (c[t+i] - c[t-i]) / (2 * sum_{i=1..N} i^2)`, with the first and
/// last rows replicated `N` times past either edge.
pub(crate) fn deltas(coefficients: &Matrix, half_window: usize) -> Matrix {
    let (frames, width) = coefficients.shape();
    let mut out = Matrix::zeros(frames, width);
    if frames == 0 || half_window == 0 {
        return out;
    }
    let denominator = 2.0 * (1..=half_window).map(|i| (i * i) as f64).sum::<f64>();
    let last = frames - 1;
    for t in 0..frames {
        let row = out.row_mut(t);
        for (col, cell) in row.iter_mut().enumerate() {
            let mut sum = 0.0_f64;
            for i in 1..=half_window {
                let ahead = coefficients.get((t + i).min(last), col);
                let behind = coefficients.get(t.saturating_sub(i), col);
                sum += i as f64 * (ahead - behind);
            }
            *cell = sum / denominator;
        }
    }
    out
}
