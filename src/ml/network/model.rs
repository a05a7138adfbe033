use crate::matrix::Matrix;

use super::weights::{HIDDEN_SIZE, INPUT_SIZE, NetworkWeights, OUTPUT_SIZE, WeightsError};

/// Two-layer feedforward network: tansig hidden layer, softmax output layer.
///
/// Evaluated column-wise: each column of the input is one time step.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoLayerNetwork {
    b1: Vec<f64>,
    iw1: Matrix,
    b2: Vec<f64>,
    lw2: Matrix,
}

impl Default for TwoLayerNetwork {
    fn default() -> Self {
        Self::from_validated(&NetworkWeights::default())
    }
}

impl TwoLayerNetwork {
    pub fn from_weights(weights: &NetworkWeights) -> Result<Self, WeightsError> {
        weights.validate()?;
        Ok(Self::from_validated(weights))
    }

    fn from_validated(weights: &NetworkWeights) -> Self {
        Self {
            b1: weights.b1.clone(),
            iw1: Matrix::from_rows(&weights.iw1),
            b2: weights.b2.clone(),
            lw2: Matrix::from_rows(&weights.lw2),
        }
    }

    pub fn input_size(&self) -> usize {
        INPUT_SIZE
    }

    /// `(OUTPUT_SIZE x T)` class probabilities for a `(INPUT_SIZE x T)` input.
    ///
    /// Panics if the input does not have `INPUT_SIZE` rows.
    pub fn forward(&self, input: &Matrix) -> Matrix {
        assert_eq!(
            input.rows(),
            INPUT_SIZE,
            "network expects {INPUT_SIZE} input rows, got {}",
            input.rows()
        );
        let mut hidden = self.iw1.matmul(input);
        hidden.add_column_broadcast(&self.b1);
        hidden.map_in_place(tansig);
        debug_assert_eq!(hidden.rows(), HIDDEN_SIZE);

        let mut output = self.lw2.matmul(&hidden);
        output.add_column_broadcast(&self.b2);
        softmax_columns(&mut output);
        debug_assert_eq!(output.rows(), OUTPUT_SIZE);
        output
    }

    /// Positive-class probability (output row 0) per time step.
    pub fn positive_scores(&self, input: &Matrix) -> Vec<f64> {
        let output = self.forward(input);
        if output.cols() == 0 {
            return Vec::new();
        }
        output.row(0).to_vec()
    }
}

/// Hyperbolic tangent sigmoid, `2 / (1 + e^(-2n)) - 1`.
pub fn tansig(n: f64) -> f64 {
    2.0 / (1.0 + (-2.0 * n).exp()) - 1.0
}

/// Softmax down each column, subtracting the column max first.
pub fn softmax_columns(values: &mut Matrix) {
    let (rows, cols) = values.shape();
    if rows == 0 {
        return;
    }
    for col in 0..cols {
        let max = (0..rows)
            .map(|row| values.get(row, col))
            .fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0_f64;
        for row in 0..rows {
            let e = (values.get(row, col) - max).exp();
            values.set(row, col, e);
            sum += e;
        }
        for row in 0..rows {
            values.set(row, col, values.get(row, col) / sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varied_input(frames: usize) -> Matrix {
        let mut input = Matrix::zeros(INPUT_SIZE, frames);
        for row in 0..INPUT_SIZE {
            for col in 0..frames {
                let value = ((row * 7 + col * 13) % 17) as f64 - 8.0;
                input.set(row, col, value * 1.5);
            }
        }
        input
    }

    #[test]
    fn output_columns_sum_to_one() {
        let network = TwoLayerNetwork::default();
        let output = network.forward(&varied_input(9));
        assert_eq!(output.shape(), (OUTPUT_SIZE, 9));
        for col in 0..output.cols() {
            let sum: f64 = output.column(col).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn extreme_inputs_stay_finite() {
        let network = TwoLayerNetwork::default();
        let mut input = varied_input(3);
        input.map_in_place(|v| v * 1e6);
        let output = network.forward(&input);
        assert!(output.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn zero_input_scores_match_bias_only_evaluation() {
        let network = TwoLayerNetwork::default();
        let scores = network.positive_scores(&Matrix::zeros(INPUT_SIZE, 4));
        assert_eq!(scores.len(), 4);
        for score in scores {
            assert!((score - 0.473_642_308_059_237).abs() < 1e-12);
        }
    }

    #[test]
    fn tansig_is_odd_and_bounded() {
        for n in [0.1, 0.5, 2.0, 10.0] {
            assert!((tansig(n) + tansig(-n)).abs() < 1e-12);
            assert!(tansig(n).abs() < 1.0 + 1e-12);
            assert!((tansig(n) - n.tanh()).abs() < 1e-12);
        }
        assert_eq!(tansig(0.0), 0.0);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let mut logits = Matrix::from_rows(&[[1000.0], [999.0]]);
        softmax_columns(&mut logits);
        let expected = 1.0 / (1.0 + (-1.0_f64).exp());
        assert!((logits.get(0, 0) - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_time_axis_yields_empty_scores() {
        let network = TwoLayerNetwork::default();
        assert!(network.positive_scores(&Matrix::zeros(INPUT_SIZE, 0)).is_empty());
    }

    #[test]
    fn rejects_invalid_weight_sets() {
        let mut weights = NetworkWeights::default();
        weights.b1.push(0.0);
        assert!(TwoLayerNetwork::from_weights(&weights).is_err());
    }

    #[test]
    #[should_panic(expected = "network expects 24 input rows")]
    fn wrong_input_height_is_a_contract_violation() {
        TwoLayerNetwork::default().forward(&Matrix::zeros(12, 3));
    }
}
