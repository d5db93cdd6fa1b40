use crate::error::Result;

/// A streaming consumer of fixed-dimension sample vectors.
///
/// The dimension is either declared on construction or taken from the first
/// sample; every later sample and every merge partner must agree with it.
pub trait Accumulator {
    type Snapshot;

    /// Established dimension, `None` while a lazily sized accumulator is empty.
    fn dimension(&self) -> Option<usize>;

    /// Number of raw samples absorbed.
    fn count(&self) -> usize;

    /// Absorb one observation. On error the accumulator is left untouched.
    fn add(&mut self, sample: &[f64]) -> Result<()>;

    /// Immutable snapshot of the current statistics.
    fn result(&self) -> Self::Snapshot;

    /// Drop all absorbed data, keeping dimension and configuration.
    fn reset(&mut self);

    /// Absorb samples in order, stopping at the first one that fails.
    fn add_all<I, S>(&mut self, samples: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[f64]>,
    {
        for s in samples {
            self.add(s.as_ref())?;
        }
        Ok(())
    }
}

/// Combination of the sufficient statistics of two independent streams.
pub trait Merge {
    fn merge(&mut self, other: &Self) -> Result<()>;
}

pub trait HasMean {
    fn mean(&self) -> Result<Vec<f64>>;
}

pub trait HasVar: HasMean {
    /// Unbiased per-component variance of the underlying observations.
    fn var(&self) -> Result<Vec<f64>>;

    /// Per-component standard error of the mean.
    fn stderror(&self) -> Result<Vec<f64>>;
}

pub trait HasCov: HasVar {
    /// Unbiased `D x D` covariance matrix, row-major.
    fn cov(&self) -> Result<Vec<Vec<f64>>>;
}

pub trait HasTau: HasVar {
    /// Integrated autocorrelation time per component; 0.5 means uncorrelated.
    fn tau(&self) -> Result<Vec<f64>>;

    /// Standard error corrected for serial correlation.
    fn error(&self) -> Result<Vec<f64>>;
}
