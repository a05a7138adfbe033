//! Inference for the fixed-weight detection network.
//!
//! Weights are trained elsewhere; this module only loads a weight set and evaluates it.

pub mod network;
