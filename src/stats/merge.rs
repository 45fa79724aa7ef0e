//! Combining partial statistics.
//!
//! Merge is element-wise addition, so it is associative and commutative and
//! the zero statistic is its identity. Callers may fold sequentially
//! ([`StatMerger`]) or reduce as a tree ([`par_merge`]) with the same result
//! up to floating-point rounding.

use crate::error::RegressionError;
use crate::stats::statistic::SufficientStatistic;

/// `a + b`.
pub fn merge(
    a: &SufficientStatistic,
    b: &SufficientStatistic,
) -> Result<SufficientStatistic, RegressionError> {
    let mut out = a.clone();
    out.absorb(b)?;
    Ok(out)
}

/// Sequential fold of any number of partials into one global statistic.
#[derive(Debug, Clone)]
pub struct StatMerger {
    total: SufficientStatistic,
    partials: usize,
}

impl StatMerger {
    /// Start from the zero statistic of effective dimension `n`.
    pub fn new(n: usize) -> Self {
        Self {
            total: SufficientStatistic::zeros(n),
            partials: 0,
        }
    }

    pub fn add(&mut self, partial: &SufficientStatistic) -> Result<(), RegressionError> {
        self.total.absorb(partial)?;
        self.partials += 1;
        Ok(())
    }

    /// Number of partials merged so far.
    pub fn partials(&self) -> usize {
        self.partials
    }

    pub fn finish(self) -> SufficientStatistic {
        self.total
    }
}

/// Merge `partials` into one statistic of effective dimension `n`.
///
/// The slice is halved recursively and the halves are merged on the rayon
/// pool with [`rayon::join`]. The tree shape depends only on
/// `partials.len()`, so the rounding is the same on every run. Zero
/// partials yield the zero statistic.
pub fn par_merge(
    n: usize,
    partials: &[SufficientStatistic],
) -> Result<SufficientStatistic, RegressionError> {
    match partials {
        [] => Ok(SufficientStatistic::zeros(n)),
        [single] => {
            let mut out = SufficientStatistic::zeros(n);
            out.absorb(single)?;
            Ok(out)
        }
        _ => {
            let (left, right) = partials.split_at(partials.len() / 2);
            let (left, right) = rayon::join(|| par_merge(n, left), || par_merge(n, right));
            let mut out = left?;
            out.absorb(&right?)?;
            Ok(out)
        }
    }
}
