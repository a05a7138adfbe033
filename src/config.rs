//! Detector settings persisted as TOML.
//!
//! Every key is optional; missing keys fall back to the trained defaults. Values given
//! on the command line override whatever the file says.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::detection::{
    BANDS, COEFFICIENT_ROWS, DEFAULT_BLOCK_FRAMES, DEFAULT_THRESHOLD, DetectorSettings,
    FRAME_LENGTH, SAMPLE_RATE,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No suitable config directory available")]
    NoConfigDir,
    #[error("Failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Frames scoring strictly above this count as detections.
    pub threshold: f64,
    /// Analysis rate files are resampled to.
    pub sample_rate: u32,
    pub nbanks: usize,
    /// Samples per frame at `sample_rate`.
    pub frame_length: usize,
    /// Frames per vote block; 0 disables block voting.
    pub block_frames: usize,
    /// Accepted file extensions, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Worker threads for batch runs; 0 picks the available parallelism.
    pub workers: usize,
    /// Replacement network weights (JSON). Relative paths resolve against the config file.
    pub weights_path: Option<PathBuf>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            sample_rate: SAMPLE_RATE,
            nbanks: BANDS,
            frame_length: FRAME_LENGTH,
            block_frames: DEFAULT_BLOCK_FRAMES,
            extensions: vec!["wav".to_string(), "mp3".to_string()],
            workers: 1,
            weights_path: None,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() {
            return invalid("threshold", format!("{} is not a finite number", self.threshold));
        }
        if self.sample_rate == 0 {
            return invalid("sample_rate", "must be positive".to_string());
        }
        if self.nbanks < COEFFICIENT_ROWS.end {
            return invalid(
                "nbanks",
                format!(
                    "{} is below the {} coefficients the network reads",
                    self.nbanks,
                    COEFFICIENT_ROWS.end
                ),
            );
        }
        if self.frame_length == 0 {
            return invalid("frame_length", "must be positive".to_string());
        }
        if self.extensions.iter().all(|ext| ext.trim().is_empty()) {
            return invalid("extensions", "at least one extension is required".to_string());
        }
        Ok(())
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            sample_rate: self.sample_rate,
            frame_length: self.frame_length,
            bands: self.nbanks,
            threshold: self.threshold,
            block_frames: self.block_frames,
        }
    }

    /// Extensions without a leading dot, lowercased.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    fn resolve_relative_paths(mut self, config_path: &Path) -> Self {
        if let (Some(weights), Some(dir)) = (self.weights_path.as_ref(), config_path.parent()) {
            if weights.is_relative() {
                self.weights_path = Some(dir.join(weights));
            }
        }
        self
    }
}

fn invalid(key: &'static str, reason: String) -> Result<(), ConfigError> {
    Err(ConfigError::InvalidValue { key, reason })
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<DetectorConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: DetectorConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    let config = config.resolve_relative_paths(path);
    config.validate()?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load the config from the app directory, returning defaults if the file is missing.
pub fn load_default_config() -> Result<DetectorConfig, ConfigError> {
    let path = default_config_path()?;
    if !path.exists() {
        return Ok(DetectorConfig::default());
    }
    load_config(&path)
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    app_dirs::config_file_path().map_err(map_app_dir_error)
}

/// Write `config` as TOML, creating parent directories as needed.
pub fn save_to_path(config: &DetectorConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}
