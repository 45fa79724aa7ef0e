//! Normal-equations solver.
//!
//! Given the sufficient statistic of a least-squares problem we solve
//!
//! ```text
//! (XᵗX + λI) θ = Xᵗy
//! ```
//!
//! Implementation choices:
//! - `λ` is a fixed damping term (default `1e-10`) against near-singular
//!   statistics, not a ridge penalty.
//! - We factor `XᵗX + λI = L Lᵗ` (Cholesky) and do a forward solve `L z = Xᵗy`
//!   followed by a back solve `Lᵗ θ = z`. No explicit inverse is formed.
//! - A matrix that does not factor is reported, never patched up with a
//!   fallback decomposition.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::domain::{Coefficients, RegressionConfig};
use crate::error::RegressionError;
use crate::stats::SufficientStatistic;

/// Solve the damped normal equations by Cholesky factorization.
///
/// `observations` is only used to describe a failure.
pub fn solve_normal_equations(
    xtx: &DMatrix<f64>,
    xty: &DVector<f64>,
    regularization: f64,
    observations: u64,
) -> Result<DVector<f64>, RegressionError> {
    let n = xty.len();
    if xtx.nrows() != n || xtx.ncols() != n {
        return Err(RegressionError::ShapeMismatch {
            expected: n,
            observed: xtx.nrows(),
        });
    }

    let unsolvable = || RegressionError::NotPositiveDefinite {
        dimension: n,
        observations,
    };

    let mut damped = xtx.clone();
    for i in 0..n {
        damped[(i, i)] += regularization;
    }

    let chol = Cholesky::new(damped).ok_or_else(unsolvable)?;
    let l = chol.l();
    let z = l.solve_lower_triangular(xty).ok_or_else(unsolvable)?;
    let theta = l.transpose().solve_upper_triangular(&z).ok_or_else(unsolvable)?;

    if theta.iter().all(|v| v.is_finite()) {
        Ok(theta)
    } else {
        Err(unsolvable())
    }
}

/// Turns one global statistic into regression coefficients.
///
/// Stateless apart from its configuration, so one global statistic may be
/// solved repeatedly (e.g. with different damping).
#[derive(Debug, Clone, Copy)]
pub struct NormalEquationsSolver {
    dimension: usize,
    bias: bool,
    regularization: f64,
}

impl NormalEquationsSolver {
    pub fn new(config: &RegressionConfig) -> Self {
        Self {
            dimension: config.effective_dimension(),
            bias: config.bias,
            regularization: config.regularization,
        }
    }

    pub fn regularization(&self) -> f64 {
        self.regularization
    }

    pub fn solve(&self, global: &SufficientStatistic) -> Result<Coefficients, RegressionError> {
        if global.dimension() != self.dimension {
            return Err(RegressionError::ShapeMismatch {
                expected: self.dimension,
                observed: global.dimension(),
            });
        }
        let theta = solve_normal_equations(
            global.cross_product_matrix(),
            global.cross_product_vector(),
            self.regularization,
            global.observation_count(),
        )?;
        Ok(Coefficients::new(theta.iter().copied().collect(), self.bias))
    }
}
