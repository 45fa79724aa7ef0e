//! Synthetic linear datasets.
//!
//! Rows follow `y = Σ w_i x_i + intercept + ε` with `x_i ~ U(-scale, scale)`
//! and `ε ~ N(0, noise)`. Generation is deterministic for a given seed.

use std::io::Write;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::distributions::Uniform;
use rand_distr::Normal;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub rows: usize,
    /// True feature coefficients; their count is the feature dimension.
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Standard deviation of the label noise (0 for exact data).
    pub noise: f64,
    /// Features are drawn from `[-feature_scale, feature_scale)`.
    pub feature_scale: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub label: f64,
    pub features: Vec<f64>,
}

/// Lazily generate `config.rows` rows.
pub fn sample_rows(config: &SampleConfig) -> Result<impl Iterator<Item = SampleRow> + use<>, AppError> {
    if config.weights.is_empty() {
        return Err(AppError::new(2, "At least one feature weight is required."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, format!("Invalid noise level: {}", config.noise)));
    }
    if !(config.feature_scale.is_finite() && config.feature_scale > 0.0) {
        return Err(AppError::new(
            2,
            format!("Invalid feature scale: {}", config.feature_scale),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise)
        .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?;
    let uniform = Uniform::new(-config.feature_scale, config.feature_scale);
    let weights = config.weights.clone();
    let intercept = config.intercept;
    let noisy = config.noise > 0.0;

    Ok((0..config.rows).map(move |_| {
        let features: Vec<f64> = (0..weights.len()).map(|_| uniform.sample(&mut rng)).collect();
        let signal: f64 = weights.iter().zip(&features).map(|(w, x)| w * x).sum();
        let eps = if noisy { normal.sample(&mut rng) } else { 0.0 };
        SampleRow {
            label: signal + intercept + eps,
            features,
        }
    }))
}

/// Write a headerless `label,feature_1,...` CSV.
pub fn write_sample_csv<W: Write>(config: &SampleConfig, writer: W) -> Result<(), AppError> {
    let rows = sample_rows(config)?;
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    for row in rows {
        let mut fields = Vec::with_capacity(row.features.len() + 1);
        fields.push(row.label.to_string());
        fields.extend(row.features.iter().map(|v| v.to_string()));
        out.write_record(&fields)
            .map_err(|e| AppError::new(2, format!("Failed to write sample CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush sample CSV: {e}")))?;
    Ok(())
}
