//! Library exports for the detector binary, benchmarks and tests.
/// Audio front-end, FFT and cepstral feature extraction.
pub mod analysis;
/// Application directory helpers.
pub mod app_dirs;
/// Directory batch runs.
pub mod batch;
/// TOML detector configuration.
pub mod config;
/// Frame scoring, thresholding and aggregation.
pub mod detection;
/// Tracing subscriber setup.
pub mod logging;
/// Dense row-major matrix used by extraction and inference.
pub mod matrix;
/// Fixed-weight detection network.
pub mod ml;
/// Text and JSON report writers.
pub mod report;
