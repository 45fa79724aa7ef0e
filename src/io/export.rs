//! Export fitted coefficients to JSON.
//!
//! The export is meant to be easy to consume in downstream scripts: names and
//! values are parallel arrays in solver order.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::pipeline::RunOutput;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct CoefficientFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub dimension: usize,
    pub bias: bool,
    pub regularization: f64,
    pub observations: u64,
    pub names: Vec<String>,
    pub coefficients: Vec<f64>,
}

impl CoefficientFile {
    pub fn from_run(run: &RunOutput) -> Self {
        Self {
            tool: "ols".to_string(),
            generated_at: Utc::now(),
            dimension: run.regression.dimension,
            bias: run.regression.bias,
            regularization: run.regression.regularization,
            observations: run.global.observation_count(),
            names: run.regression.coefficient_names(),
            coefficients: run.coefficients.values().to_vec(),
        }
    }
}

/// Write a coefficient JSON file.
pub fn write_coefficients_json(path: &Path, run: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create coefficient JSON '{}': {e}", path.display()))
    })?;

    serde_json::to_writer_pretty(file, &CoefficientFile::from_run(run))
        .map_err(|e| AppError::new(2, format!("Failed to write coefficient JSON: {e}")))?;

    Ok(())
}
