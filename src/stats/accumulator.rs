//! Per-partition accumulation of `XᵗX` and `Xᵗy`.
//!
//! An accumulator is owned by exactly one worker while it consumes its
//! partition's records, then handed over by value with [`StatAccumulator::finish`].

use nalgebra::DVector;

use crate::domain::RegressionConfig;
use crate::error::RegressionError;
use crate::stats::record::Record;
use crate::stats::statistic::SufficientStatistic;

#[derive(Debug, Clone)]
pub struct StatAccumulator {
    dimension: usize,
    bias: bool,
    stat: SufficientStatistic,
    // Reused augmented feature vector.
    x: DVector<f64>,
}

impl StatAccumulator {
    pub fn new(config: &RegressionConfig) -> Self {
        let n = config.effective_dimension();
        Self {
            dimension: config.dimension,
            bias: config.bias,
            stat: SufficientStatistic::zeros(n),
            x: DVector::zeros(n),
        }
    }

    /// Fold one observation.
    ///
    /// `features` must hold exactly `dimension` values; the bias term is
    /// appended here. On error the accumulator is left untouched.
    pub fn push(&mut self, label: f64, features: &[f64]) -> Result<(), RegressionError> {
        if features.len() != self.dimension {
            return Err(RegressionError::DimensionMismatch {
                expected: self.dimension,
                observed: features.len(),
            });
        }

        self.x.as_mut_slice()[..self.dimension].copy_from_slice(features);
        if self.bias {
            self.x[self.dimension] = 1.0;
        }
        self.stat.add_observation(label, &self.x);
        Ok(())
    }

    pub fn push_record(&mut self, record: &Record) -> Result<(), RegressionError> {
        self.push(record.label, &record.features)
    }

    /// Parse raw tokens (`label, feature_1, ...`) and fold them.
    pub fn push_tokens<I, S>(&mut self, tokens: I) -> Result<(), RegressionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let record = Record::parse(tokens)?;
        self.push_record(&record)
    }

    pub fn observation_count(&self) -> u64 {
        self.stat.observation_count()
    }

    /// Current state, without consuming the accumulator.
    pub fn statistic(&self) -> &SufficientStatistic {
        &self.stat
    }

    /// Emit the partition's partial statistic unchanged.
    pub fn finish(self) -> SufficientStatistic {
        self.stat
    }
}
