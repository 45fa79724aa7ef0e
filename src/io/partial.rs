//! Read/write partial-statistic JSON files.
//!
//! A partial file is what one `accumulate` process hands to a later `solve`
//! process:
//! - the regression shape it was accumulated with (dimension + bias)
//! - the raw `XᵗX` rows, `Xᵗy` and observation count
//!
//! Decoding re-checks every invariant of [`SufficientStatistic`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::RegressionConfig;
use crate::error::{AppError, RegressionError};
use crate::stats::SufficientStatistic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialFile {
    pub tool: String,
    pub dimension: usize,
    pub bias: bool,
    pub observations: u64,
    pub cross_product_matrix: Vec<Vec<f64>>,
    pub cross_product_vector: Vec<f64>,
}

impl PartialFile {
    pub fn from_statistic(config: &RegressionConfig, stat: &SufficientStatistic) -> Self {
        let m = stat.cross_product_matrix();
        Self {
            tool: "ols".to_string(),
            dimension: config.dimension,
            bias: config.bias,
            observations: stat.observation_count(),
            cross_product_matrix: m
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            cross_product_vector: stat.cross_product_vector().iter().copied().collect(),
        }
    }

    /// Effective dimension declared by the header fields.
    pub fn effective_dimension(&self) -> usize {
        self.dimension + usize::from(self.bias)
    }

    pub fn into_statistic(self) -> Result<SufficientStatistic, RegressionError> {
        let n = self.effective_dimension();
        if self.cross_product_vector.len() != n {
            return Err(RegressionError::ShapeMismatch {
                expected: n,
                observed: self.cross_product_vector.len(),
            });
        }
        if self.cross_product_matrix.len() != n {
            return Err(RegressionError::ShapeMismatch {
                expected: n,
                observed: self.cross_product_matrix.len(),
            });
        }
        if let Some(row) = self.cross_product_matrix.iter().find(|row| row.len() != n) {
            return Err(RegressionError::ShapeMismatch {
                expected: n,
                observed: row.len(),
            });
        }

        let rows = &self.cross_product_matrix;
        let xtx = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        let xty = DVector::from_vec(self.cross_product_vector);
        SufficientStatistic::from_parts(xtx, xty, self.observations)
    }
}

/// Write a partial-statistic JSON file.
pub fn write_partial_json(
    path: &Path,
    config: &RegressionConfig,
    stat: &SufficientStatistic,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create partial JSON '{}': {e}", path.display()))
    })?;

    serde_json::to_writer_pretty(file, &PartialFile::from_statistic(config, stat))
        .map_err(|e| AppError::new(2, format!("Failed to write partial JSON: {e}")))?;

    Ok(())
}

/// Read a partial-statistic JSON file.
pub fn read_partial_json(path: &Path) -> Result<PartialFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open partial JSON '{}': {e}", path.display()))
    })?;
    let partial: PartialFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        AppError::new(2, format!("Invalid partial JSON '{}': {e}", path.display()))
    })?;
    Ok(partial)
}
