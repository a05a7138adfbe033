//! Small dense row-major matrix used for coefficient matrices and network tensors.
//!
//! Shapes in this crate are tiny (2x24, 2x2, 41xT) so a flat `Vec<f64>` with explicit
//! row/column bookkeeping is all that is needed. Shape mismatches are caller bugs and panic.

use std::ops::Range;

/// Row-major `f64` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a `rows x cols` matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "matrix buffer holds {} values, shape {rows}x{cols} needs {}",
            data.len(),
            rows * cols
        );
        Self { rows, cols, data }
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Self {
        let cols = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (idx, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            assert_eq!(row.len(), cols, "row {idx} has {} columns, expected {cols}", row.len());
            data.extend_from_slice(row);
        }
        Self {
            rows: rows.len(),
            cols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.index(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.index(row, col);
        self.data[idx] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.rows, "row {row} out of range for {} rows", self.rows);
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        assert!(row < self.rows, "row {row} out of range for {} rows", self.rows);
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|row| self.get(row, col)).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.cols, self.rows);
        for row in 0..self.rows {
            for col in 0..self.cols {
                out.data[col * self.rows + row] = self.data[row * self.cols + col];
            }
        }
        out
    }

    /// Matrix product `self * rhs`.
    pub fn matmul(&self, rhs: &Matrix) -> Self {
        assert_eq!(
            self.cols, rhs.rows,
            "cannot multiply {}x{} by {}x{}",
            self.rows, self.cols, rhs.rows, rhs.cols
        );
        let mut out = Self::zeros(self.rows, rhs.cols);
        for row in 0..self.rows {
            let lhs_row = self.row(row);
            for col in 0..rhs.cols {
                let mut sum = 0.0_f64;
                for (k, &lhs) in lhs_row.iter().enumerate() {
                    sum += lhs * rhs.data[k * rhs.cols + col];
                }
                out.data[row * rhs.cols + col] = sum;
            }
        }
        out
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, vector: &[f64]) -> Vec<f64> {
        assert_eq!(
            self.cols,
            vector.len(),
            "cannot multiply {}x{} by a vector of {}",
            self.rows,
            self.cols,
            vector.len()
        );
        (0..self.rows)
            .map(|row| {
                self.row(row)
                    .iter()
                    .zip(vector)
                    .map(|(weight, value)| weight * value)
                    .sum()
            })
            .collect()
    }

    /// Add `bias[row]` to every element of that row.
    pub fn add_column_broadcast(&mut self, bias: &[f64]) {
        assert_eq!(bias.len(), self.rows, "bias length must match row count");
        for (row, &offset) in bias.iter().enumerate() {
            for value in self.row_mut(row) {
                *value += offset;
            }
        }
    }

    pub fn map_in_place(&mut self, mut f: impl FnMut(f64) -> f64) {
        for value in &mut self.data {
            *value = f(*value);
        }
    }

    /// Copy out a contiguous range of rows.
    pub fn select_rows(&self, range: Range<usize>) -> Self {
        assert!(
            range.start <= range.end && range.end <= self.rows,
            "row range {range:?} out of bounds for {} rows",
            self.rows
        );
        let data = self.data[range.start * self.cols..range.end * self.cols].to_vec();
        Self::from_vec(range.len(), self.cols, data)
    }

    /// Stack `self` on top of `below`.
    pub fn vstack(&self, below: &Matrix) -> Self {
        assert_eq!(
            self.cols, below.cols,
            "cannot stack {} columns on {} columns",
            self.cols, below.cols
        );
        let mut data = Vec::with_capacity(self.data.len() + below.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&below.data);
        Self::from_vec(self.rows + below.rows, self.cols, data)
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}x{}",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }
}
