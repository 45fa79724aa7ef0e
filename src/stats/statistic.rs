//! The sufficient statistic of a least-squares problem.
//!
//! For records `(y_i, x_i)` we keep
//!
//! ```text
//! XᵗX = Σ x_i x_iᵗ      (n × n, symmetric)
//! Xᵗy = Σ y_i x_i       (n)
//! count                 (number of records)
//! ```
//!
//! Both a partition's partial result and the merged global result have this
//! shape. Sums are raw: nothing is normalized or averaged.

use nalgebra::{DMatrix, DVector};

use crate::error::RegressionError;

/// Relative tolerance for the symmetry check on decoded statistics.
const SYMMETRY_TOL: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStatistic {
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
    count: u64,
}

impl SufficientStatistic {
    /// The additive identity for effective dimension `n`.
    pub fn zeros(n: usize) -> Self {
        Self {
            xtx: DMatrix::zeros(n, n),
            xty: DVector::zeros(n),
            count: 0,
        }
    }

    /// Rebuild a statistic from its parts, checking every invariant.
    ///
    /// Used when a statistic crosses a process boundary.
    pub fn from_parts(
        xtx: DMatrix<f64>,
        xty: DVector<f64>,
        count: u64,
    ) -> Result<Self, RegressionError> {
        let n = xty.len();
        if xtx.nrows() != n {
            return Err(RegressionError::ShapeMismatch {
                expected: n,
                observed: xtx.nrows(),
            });
        }
        if xtx.ncols() != n {
            return Err(RegressionError::ShapeMismatch {
                expected: n,
                observed: xtx.ncols(),
            });
        }
        if !(xtx.iter().all(|v| v.is_finite()) && xty.iter().all(|v| v.is_finite())) {
            return Err(RegressionError::InvalidStatistic {
                reason: "non-finite entry".to_string(),
            });
        }
        for i in 0..n {
            for j in (i + 1)..n {
                let a = xtx[(i, j)];
                let b = xtx[(j, i)];
                let scale = a.abs().max(b.abs()).max(1.0);
                if (a - b).abs() > SYMMETRY_TOL * scale {
                    return Err(RegressionError::InvalidStatistic {
                        reason: format!("cross-product matrix is not symmetric at ({i}, {j})"),
                    });
                }
            }
        }
        Ok(Self { xtx, xty, count })
    }

    /// Effective dimension `n`.
    pub fn dimension(&self) -> usize {
        self.xty.len()
    }

    pub fn cross_product_matrix(&self) -> &DMatrix<f64> {
        &self.xtx
    }

    pub fn cross_product_vector(&self) -> &DVector<f64> {
        &self.xty
    }

    pub fn observation_count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fold one augmented observation `x` with label `y`.
    ///
    /// `x.len()` must equal `self.dimension()`; the accumulator guarantees it.
    pub(crate) fn add_observation(&mut self, label: f64, x: &DVector<f64>) {
        // Rank-1 update. x_i * x_j == x_j * x_i in IEEE arithmetic, so the
        // matrix stays exactly symmetric.
        self.xtx.ger(1.0, x, x, 1.0);
        self.xty.axpy(label, x, 1.0);
        self.count += 1;
    }

    /// Element-wise add `other` into `self`.
    pub fn absorb(&mut self, other: &SufficientStatistic) -> Result<(), RegressionError> {
        if other.dimension() != self.dimension() {
            return Err(RegressionError::ShapeMismatch {
                expected: self.dimension(),
                observed: other.dimension(),
            });
        }
        self.xtx += &other.xtx;
        self.xty += &other.xty;
        self.count += other.count;
        Ok(())
    }

    /// Largest absolute element-wise difference, or `None` if shapes differ.
    pub fn max_abs_diff(&self, other: &SufficientStatistic) -> Option<f64> {
        if self.dimension() != other.dimension() {
            return None;
        }
        let m = (&self.xtx - &other.xtx).amax();
        let v = (&self.xty - &other.xty).amax();
        Some(m.max(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_is_empty_with_requested_shape() {
        let s = SufficientStatistic::zeros(3);
        assert_eq!(s.dimension(), 3);
        assert_eq!(s.cross_product_matrix().shape(), (3, 3));
        assert!(s.is_empty());
        assert!(s.cross_product_matrix().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn add_observation_accumulates_outer_product() {
        let mut s = SufficientStatistic::zeros(2);
        s.add_observation(5.0, &DVector::from_row_slice(&[2.0, 1.0]));
        assert_eq!(
            s.cross_product_matrix(),
            &DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 1.0])
        );
        assert_eq!(s.cross_product_vector(), &DVector::from_row_slice(&[10.0, 5.0]));
        assert_eq!(s.observation_count(), 1);
    }

    #[test]
    fn from_parts_rejects_bad_shapes() {
        let err = SufficientStatistic::from_parts(DMatrix::zeros(2, 2), DVector::zeros(3), 0)
            .unwrap_err();
        assert_eq!(
            err,
            RegressionError::ShapeMismatch {
                expected: 3,
                observed: 2
            }
        );
        assert!(SufficientStatistic::from_parts(DMatrix::zeros(2, 3), DVector::zeros(2), 0).is_err());
    }

    #[test]
    fn from_parts_rejects_asymmetric_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let err = SufficientStatistic::from_parts(m, DVector::zeros(2), 1).unwrap_err();
        assert!(matches!(err, RegressionError::InvalidStatistic { .. }));
    }

    #[test]
    fn absorb_checks_dimension() {
        let mut a = SufficientStatistic::zeros(2);
        let b = SufficientStatistic::zeros(3);
        assert_eq!(
            a.absorb(&b).unwrap_err(),
            RegressionError::ShapeMismatch {
                expected: 2,
                observed: 3
            }
        );
    }
}
