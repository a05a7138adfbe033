//! Fixed-topology detection network (24 inputs, 2 tansig hidden units, 2 softmax outputs).

mod model;
mod weights;

pub use model::{TwoLayerNetwork, softmax_columns, tansig};
pub use weights::{
    DEFAULT_B1, DEFAULT_B2, DEFAULT_IW1, DEFAULT_LW2, HIDDEN_SIZE, INPUT_SIZE, NetworkWeights,
    OUTPUT_SIZE, WeightsError,
};
