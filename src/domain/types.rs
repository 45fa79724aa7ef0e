//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built from CLI flags / environment
//! - passed by reference through the pipeline stages
//! - exported to JSON once a run finishes

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::RegressionError;

/// Diagonal damping added before the Cholesky factorization.
pub const DEFAULT_REGULARIZATION: f64 = 1e-10;

/// Shape and damping of one regression run.
///
/// Fixed for the lifetime of a run: every accumulator, the merger and the
/// solver must be built from the same value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionConfig {
    /// Number of explanatory features per record, excluding the bias term.
    pub dimension: usize,
    /// Append a constant `1.0` feature to every record.
    pub bias: bool,
    /// Constant added to the diagonal of `XᵗX` before factoring.
    pub regularization: f64,
}

impl RegressionConfig {
    pub fn new(dimension: usize, bias: bool) -> Self {
        Self {
            dimension,
            bias,
            regularization: DEFAULT_REGULARIZATION,
        }
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    /// `n = d + (bias ? 1 : 0)`: the length of the augmented feature vector.
    pub fn effective_dimension(&self) -> usize {
        self.dimension + usize::from(self.bias)
    }

    pub fn validate(&self) -> Result<(), RegressionError> {
        if self.effective_dimension() == 0 {
            return Err(RegressionError::InvalidConfig {
                reason: "dimension must be > 0 when bias is disabled".to_string(),
            });
        }
        if !(self.regularization.is_finite() && self.regularization >= 0.0) {
            return Err(RegressionError::InvalidConfig {
                reason: format!(
                    "regularization must be finite and >= 0 (got {})",
                    self.regularization
                ),
            });
        }
        Ok(())
    }

    /// Display names of the coefficients, in solver output order.
    pub fn coefficient_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (1..=self.dimension).map(|i| format!("x{i}")).collect();
        if self.bias {
            names.push("bias".to_string());
        }
        names
    }
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self::new(8, true)
    }
}

/// What to do with a record that fails to parse or has the wrong dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum BadRecordPolicy {
    /// Stop the whole run on the first bad record.
    #[default]
    Abort,
    /// Drop the record, log a warning and keep going.
    Skip,
}

/// Terminal output format for `fit` / `solve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable run summary.
    #[default]
    Text,
    /// Only the JSON array of coefficients.
    Json,
}

/// Fitted regression coefficients.
///
/// Ordered like the augmented feature vector: explanatory features first,
/// the bias coefficient last when enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficients {
    values: Vec<f64>,
    bias: bool,
}

impl Coefficients {
    pub fn new(values: Vec<f64>, bias: bool) -> Self {
        Self { values, bias }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coefficients of the explanatory features (bias excluded).
    pub fn weights(&self) -> &[f64] {
        if self.bias {
            &self.values[..self.values.len().saturating_sub(1)]
        } else {
            &self.values
        }
    }

    pub fn intercept(&self) -> Option<f64> {
        if self.bias { self.values.last().copied() } else { None }
    }
}

/// A full run's configuration as understood by the `fit` / `accumulate` drivers.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Input CSV files; `-` reads stdin.
    pub inputs: Vec<PathBuf>,
    pub regression: RegressionConfig,
    /// Number of independent accumulators.
    pub partitions: usize,
    /// Records read per batch before they are fanned out to the partitions.
    pub batch_size: usize,
    pub bad_record: BadRecordPolicy,
    pub format: OutputFormat,
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_dimension_counts_bias() {
        assert_eq!(RegressionConfig::new(2, true).effective_dimension(), 3);
        assert_eq!(RegressionConfig::new(2, false).effective_dimension(), 2);
    }

    #[test]
    fn validate_rejects_empty_shape_and_bad_damping() {
        assert!(RegressionConfig::new(0, false).validate().is_err());
        assert!(RegressionConfig::new(0, true).validate().is_ok());
        assert!(
            RegressionConfig::new(2, true)
                .with_regularization(-1.0)
                .validate()
                .is_err()
        );
        assert!(
            RegressionConfig::new(2, true)
                .with_regularization(f64::NAN)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn coefficients_split_bias_from_weights() {
        let c = Coefficients::new(vec![3.0, -1.0, 2.0], true);
        assert_eq!(c.weights(), &[3.0, -1.0]);
        assert_eq!(c.intercept(), Some(2.0));

        let c = Coefficients::new(vec![3.0, -1.0], false);
        assert_eq!(c.weights(), &[3.0, -1.0]);
        assert_eq!(c.intercept(), None);
    }

    #[test]
    fn coefficient_names_put_bias_last() {
        let names = RegressionConfig::new(2, true).coefficient_names();
        assert_eq!(names, vec!["x1", "x2", "bias"]);
    }
}
