use thiserror::Error;

/// Failures of the accumulate / merge / solve core.
///
/// Each variant is raised by the stage that first observes the condition and
/// carries the values a caller needs to act on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    /// A record token is not a finite number.
    #[error("Invalid numeric token '{token}' at position {position}")]
    Parse { token: String, position: usize },

    /// A record carries the wrong number of explanatory features.
    #[error("Expected number of dimensions: {expected}, observed: {observed}")]
    DimensionMismatch { expected: usize, observed: usize },

    /// Two statistics (or a statistic and a solver) disagree on the effective dimension.
    #[error("Statistic shape mismatch: expected dimension {expected}, observed {observed}")]
    ShapeMismatch { expected: usize, observed: usize },

    /// The damped cross-product matrix has no Cholesky factor.
    #[error(
        "Regression unsolvable with current data: damped {dimension}x{dimension} cross-product matrix \
         is not positive-definite ({observations} observations)"
    )]
    NotPositiveDefinite { dimension: usize, observations: u64 },

    /// A decoded statistic breaks an invariant other than its shape.
    #[error("Invalid statistic: {reason}")]
    InvalidStatistic { reason: String },

    #[error("Invalid regression config: {reason}")]
    InvalidConfig { reason: String },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<RegressionError> for AppError {
    fn from(err: RegressionError) -> Self {
        let exit_code = match &err {
            RegressionError::InvalidConfig { .. } => 2,
            RegressionError::Parse { .. } | RegressionError::DimensionMismatch { .. } => 3,
            RegressionError::ShapeMismatch { .. }
            | RegressionError::NotPositiveDefinite { .. }
            | RegressionError::InvalidStatistic { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
