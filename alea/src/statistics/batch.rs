use crate::config::BatchConfig;
use crate::error::{check_dimension, merged_dimension, AleaError, Result};

use super::mean::MeanAcc;
use super::result::BatchResult;
use super::traits::{Accumulator, HasMean, HasVar, Merge};
use super::variance::VarAcc;

/// Fixed-size batch means.
///
/// Raw samples fill a within-batch [`MeanAcc`]; when it holds exactly
/// `batch_size` samples its mean becomes one observation of the outer
/// accumulator and the inner one starts over. Statistics are over completed
/// batches only; a trailing partial batch counts once [`flush`](Self::flush)
/// commits it.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAcc {
    config: BatchConfig,
    dim: Option<usize>,
    count: usize,
    current: MeanAcc,
    batches: VarAcc,
}

impl BatchAcc {
    /// A dimension of 0 defers sizing to the first sample.
    pub fn new(dim: usize, batch_size: usize) -> Result<Self> {
        let config = BatchConfig::new(batch_size)?;
        Ok(Self {
            config,
            dim: (dim > 0).then_some(dim),
            count: 0,
            current: MeanAcc::new(dim),
            batches: VarAcc::new(dim),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn num_batches(&self) -> usize {
        self.batches.count()
    }

    /// Samples waiting in the unfinished batch.
    pub fn partial_len(&self) -> usize {
        self.current.count()
    }

    /// Commit the partial batch, if any, regardless of its fill level.
    ///
    /// Only meaningful once the stream is known to be finished. Returns
    /// whether a batch was committed.
    pub fn flush(&mut self) -> bool {
        if self.current.count() == 0 {
            return false;
        }
        self.close_batch();
        true
    }

    pub fn merge_result(&mut self, other: &BatchResult) -> Result<()> {
        self.merge(other.acc())
    }

    fn size_to(&mut self, dim: usize) {
        self.dim = Some(dim);
        self.current = MeanAcc::new(dim);
        self.batches = VarAcc::new(dim);
    }

    /// Commit the partial batch as one batch mean. Callers only close a
    /// non-empty batch.
    fn close_batch(&mut self) {
        debug_assert!(self.current.count() > 0);
        let n = self.current.count() as f64;
        let m: Vec<f64> = self.current.sum().iter().map(|s| s / n).collect();
        self.batches.absorb(&m);
        self.current.reset();
    }
}

impl Accumulator for BatchAcc {
    type Snapshot = BatchResult;

    fn dimension(&self) -> Option<usize> {
        self.dim
    }

    /// Raw samples absorbed, including those of the partial batch.
    fn count(&self) -> usize {
        self.count
    }

    fn add(&mut self, sample: &[f64]) -> Result<()> {
        check_dimension(self.dim, sample.len())?;
        if self.dim.is_none() {
            self.size_to(sample.len());
        }
        self.current.add(sample)?;
        self.count += 1;
        if self.current.count() == self.config.batch_size {
            self.close_batch();
        }
        Ok(())
    }

    fn result(&self) -> BatchResult {
        BatchResult::new(self.clone())
    }

    fn reset(&mut self) {
        self.count = 0;
        self.current.reset();
        self.batches.reset();
    }
}

/// Completed batches merge exactly. The two partial batches are pooled; if
/// the pool reaches `batch_size` it is committed as a single batch.
impl Merge for BatchAcc {
    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.config != other.config {
            return Err(AleaError::IncompatibleAccumulator(format!(
                "batch size {} vs {}",
                self.config.batch_size, other.config.batch_size
            )));
        }
        let dim = merged_dimension(self.dim, other.dim)?;
        if let (None, Some(d)) = (self.dim, dim) {
            self.size_to(d);
        }
        self.batches.merge(&other.batches)?;
        self.current.merge(&other.current)?;
        self.count += other.count;
        if self.current.count() >= self.config.batch_size {
            tracing::debug!(
                pooled = self.current.count(),
                batch_size = self.config.batch_size,
                "committing pooled partial batches"
            );
            self.close_batch();
        }
        Ok(())
    }
}

impl HasMean for BatchAcc {
    /// Mean over completed batch means.
    fn mean(&self) -> Result<Vec<f64>> {
        self.batches.mean()
    }
}

impl HasVar for BatchAcc {
    /// Variance of the batch means.
    fn var(&self) -> Result<Vec<f64>> {
        self.batches.var()
    }

    fn stderror(&self) -> Result<Vec<f64>> {
        self.batches.stderror()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_batch_size() {
        assert!(matches!(
            BatchAcc::new(1, 0),
            Err(AleaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_num_batches_and_flush() {
        let mut acc = BatchAcc::new(1, 4).unwrap();
        for i in 0..10 {
            acc.add(&[i as f64]).unwrap();
        }
        assert_eq!(acc.count(), 10);
        assert_eq!(acc.num_batches(), 2);
        assert_eq!(acc.partial_len(), 2);
        assert_eq!(acc.mean().unwrap(), vec![3.5]);
        assert!((acc.var().unwrap()[0] - 8.0).abs() < 1e-12);

        assert!(acc.flush());
        assert_eq!(acc.num_batches(), 3);
        assert_eq!(acc.partial_len(), 0);
        assert!(!acc.flush());
        assert_eq!(acc.num_batches(), 3);
    }

    #[test]
    fn test_flush_commits_short_batch_mean() {
        let mut acc = BatchAcc::new(2, 4).unwrap();
        acc.add_all([[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0], [10.0, -1.0]])
            .unwrap();
        assert_eq!(acc.mean().unwrap(), vec![2.5, 0.0]);
        assert!(acc.flush());
        // The one-sample batch counts with its own mean, not the batch size.
        assert_eq!(acc.num_batches(), 2);
        assert_eq!(acc.mean().unwrap(), vec![6.25, -0.5]);
    }

    #[test]
    fn test_needs_completed_batches() {
        let mut acc = BatchAcc::new(2, 3).unwrap();
        acc.add_all([[1.0, 1.0], [2.0, 2.0]]).unwrap();
        assert!(acc.mean().is_err());
        acc.add(&[3.0, 3.0]).unwrap();
        assert_eq!(acc.mean().unwrap(), vec![2.0, 2.0]);
        assert!(acc.var().is_err());
    }

    #[test]
    fn test_merge() {
        let mut a = BatchAcc::new(1, 4).unwrap();
        let mut b = BatchAcc::new(1, 4).unwrap();
        for i in 0..6 {
            a.add(&[i as f64]).unwrap();
        }
        for i in 6..13 {
            b.add(&[i as f64]).unwrap();
        }
        // a: one batch + 2 pending, b: one batch + 3 pending -> pooled 5 >= 4.
        a.merge(&b).unwrap();
        assert_eq!(a.count(), 13);
        assert_eq!(a.num_batches(), 3);
        assert_eq!(a.partial_len(), 0);

        let c = BatchAcc::new(1, 5).unwrap();
        assert!(matches!(
            a.merge(&c),
            Err(AleaError::IncompatibleAccumulator(_))
        ));
    }

    #[test]
    fn test_failed_add_leaves_state() {
        let mut acc = BatchAcc::new(2, 2).unwrap();
        acc.add(&[1.0, 2.0]).unwrap();
        let before = acc.clone();
        assert!(acc.add(&[1.0, 2.0, 3.0]).is_err());
        assert_eq!(acc, before);
    }
}
