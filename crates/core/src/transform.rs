//! Transformation matrices

use crate::collection::identified;
use crate::error::{SffError, SffResult};
use crate::types::Id;

/// Row-major matrix, typically a 3x4 affine transform
#[derive(Debug, Clone, PartialEq)]
pub struct TransformationMatrix {
    /// Id within the segmentation's transform collection
    pub id: Option<Id>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

identified!(TransformationMatrix, "transform");

impl TransformationMatrix {
    /// Create a matrix; `data.len()` must equal `rows * cols`
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> SffResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(SffError::invalid_shape(
                "transform",
                format!("dimensions must be positive, got {}x{}", rows, cols),
            ));
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(SffError::invalid_shape(
                "transform",
                format!(
                    "{} values for a {}x{} matrix",
                    data.len(),
                    rows,
                    cols
                ),
            ));
        }
        Ok(Self {
            id: None,
            rows,
            cols,
            data,
        })
    }

    /// 3x4 affine identity
    pub fn identity() -> Self {
        Self {
            id: None,
            rows: 3,
            cols: 4,
            data: vec![
                1.0, 0.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
        }
    }

    /// Set the id
    pub fn with_id(mut self, id: Id) -> Self {
        self.id = Some(id);
        self
    }

    /// Row count
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major values
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col).copied()
    }
}
