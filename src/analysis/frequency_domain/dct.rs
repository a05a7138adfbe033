use std::f64::consts::PI;

/// Orthonormal DCT-II: `y[k] = s(k) * sum x[n] cos(pi k (2n + 1) / 2N)` with
/// `s(0) = sqrt(1/N)` and `s(k) = sqrt(2/N)` otherwise.
pub(crate) fn dct_ii_orthonormal(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let len = n as f64;
    let dc_scale = (1.0 / len).sqrt();
    let ac_scale = (2.0 / len).sqrt();
    (0..n)
        .map(|k| {
            let mut sum = 0.0_f64;
            for (m, &v) in values.iter().enumerate() {
                let angle = PI * k as f64 * (2 * m + 1) as f64 / (2.0 * len);
                sum += v * angle.cos();
            }
            let scale = if k == 0 { dc_scale } else { ac_scale };
            scale * sum
        })
        .collect()
}
