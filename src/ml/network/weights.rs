use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input features per frame: 12 MFCCs stacked on 12 deltas.
pub const INPUT_SIZE: usize = 24;
pub const HIDDEN_SIZE: usize = 2;
pub const OUTPUT_SIZE: usize = 2;

/// Hidden layer bias.
pub const DEFAULT_B1: [f64; HIDDEN_SIZE] = [1.8916010551494097935, 2.0087474377775778045];

/// Input-to-hidden weights, one row per hidden unit.
pub const DEFAULT_IW1: [[f64; INPUT_SIZE]; HIDDEN_SIZE] = [
    [
        0.1998886754907664709,
        0.57158025640225418318,
        0.073053558551228664486,
        0.30815336956943989444,
        -0.36003003489407331417,
        0.35955390517506552461,
        -0.55180303576284406297,
        0.36854512746086781627,
        -0.11990989497331375202,
        -0.12415192057333071518,
        -0.11036941186308167617,
        0.17488461021140797036,
        -0.013529466284958970024,
        -0.14750359472676494166,
        0.055395201464141327619,
        0.37214938872552660865,
        -0.24550221656609863552,
        0.26630143218921387138,
        -0.47940732926561213656,
        -0.50824973434697218178,
        0.38211640719584838433,
        0.62598088027513776321,
        0.23283702476734549625,
        0.67685222502032615921,
    ],
    [
        -0.58969760140591542807,
        0.13612969647931399964,
        0.28130343863305534713,
        0.44360322873237156838,
        0.025224012033459614068,
        -0.40590449389022426052,
        1.1143112752679664723,
        -0.2161903374887501339,
        0.23162703430932926607,
        -0.32741518794124441216,
        0.47349665037919996813,
        -0.45920452643889042577,
        -0.14105785899327966115,
        0.031379435557255155875,
        0.35720107620842272977,
        0.21229694142108621047,
        -0.20368656129300038993,
        0.1738414724904205344,
        -0.35063776391904794005,
        -0.6775042296727354918,
        -0.17173184806768476696,
        0.46230394894357262903,
        0.14771323500073230139,
        0.79802613525304866293,
    ],
];

/// Output layer bias.
pub const DEFAULT_B2: [f64; OUTPUT_SIZE] = [-0.089268169590198245822, 0.52228923760607492977];

/// Hidden-to-output weights, one row per output unit.
pub const DEFAULT_LW2: [[f64; HIDDEN_SIZE]; OUTPUT_SIZE] = [
    [-0.44486678654834321822, 1.1688121908846942354],
    [1.0641647684820378927, -0.85051800764122009735],
];

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("Failed to read weights from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse weights: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Weight tensor {field} has shape {found}, expected {expected}")]
    Shape {
        field: &'static str,
        expected: String,
        found: String,
    },
    #[error("Weight tensor {field} contains a non-finite value")]
    NonFinite { field: &'static str },
}

/// Serializable weight set for the two-layer network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkWeights {
    /// Hidden bias (`HIDDEN_SIZE`).
    pub b1: Vec<f64>,
    /// Input weights (`HIDDEN_SIZE x INPUT_SIZE`).
    pub iw1: Vec<Vec<f64>>,
    /// Output bias (`OUTPUT_SIZE`).
    pub b2: Vec<f64>,
    /// Output weights (`OUTPUT_SIZE x HIDDEN_SIZE`).
    pub lw2: Vec<Vec<f64>>,
}

impl Default for NetworkWeights {
    /// The compiled-in weight set.
    fn default() -> Self {
        Self {
            b1: DEFAULT_B1.to_vec(),
            iw1: DEFAULT_IW1.iter().map(|row| row.to_vec()).collect(),
            b2: DEFAULT_B2.to_vec(),
            lw2: DEFAULT_LW2.iter().map(|row| row.to_vec()).collect(),
        }
    }
}

impl NetworkWeights {
    pub fn from_json_str(json: &str) -> Result<Self, WeightsError> {
        let weights: Self = serde_json::from_str(json)?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn load(path: &Path) -> Result<Self, WeightsError> {
        let json = std::fs::read_to_string(path).map_err(|source| WeightsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let weights = Self::from_json_str(&json)?;
        tracing::info!("Loaded network weights from {}", path.display());
        Ok(weights)
    }

    pub fn to_json_pretty(&self) -> Result<String, WeightsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every tensor against the fixed topology.
    pub fn validate(&self) -> Result<(), WeightsError> {
        check_vector("b1", &self.b1, HIDDEN_SIZE)?;
        check_matrix("iw1", &self.iw1, HIDDEN_SIZE, INPUT_SIZE)?;
        check_vector("b2", &self.b2, OUTPUT_SIZE)?;
        check_matrix("lw2", &self.lw2, OUTPUT_SIZE, HIDDEN_SIZE)?;
        Ok(())
    }
}

fn check_vector(field: &'static str, values: &[f64], len: usize) -> Result<(), WeightsError> {
    if values.len() != len {
        return Err(WeightsError::Shape {
            field,
            expected: format!("[{len}]"),
            found: format!("[{}]", values.len()),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(WeightsError::NonFinite { field });
    }
    Ok(())
}

fn check_matrix(
    field: &'static str,
    rows: &[Vec<f64>],
    expected_rows: usize,
    expected_cols: usize,
) -> Result<(), WeightsError> {
    let shape_error = |found: String| WeightsError::Shape {
        field,
        expected: format!("[{expected_rows}x{expected_cols}]"),
        found,
    };
    if rows.len() != expected_rows {
        return Err(shape_error(format!("[{} rows]", rows.len())));
    }
    for row in rows {
        if row.len() != expected_cols {
            return Err(shape_error(format!("[{}x{}]", rows.len(), row.len())));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(WeightsError::NonFinite { field });
        }
    }
    Ok(())
}
