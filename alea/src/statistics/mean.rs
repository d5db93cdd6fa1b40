use crate::error::{check_dimension, merged_dimension, require, Result};

use super::result::MeanResult;
use super::traits::{Accumulator, HasMean, Merge};

/// Running count and per-component sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeanAcc {
    dim: Option<usize>,
    count: usize,
    sum: Vec<f64>,
}

impl MeanAcc {
    /// A dimension of 0 defers sizing to the first sample.
    pub fn new(dim: usize) -> Self {
        Self {
            dim: (dim > 0).then_some(dim),
            count: 0,
            sum: vec![0.0; dim],
        }
    }

    pub fn sum(&self) -> &[f64] {
        &self.sum
    }

    pub fn merge_result(&mut self, other: &MeanResult) -> Result<()> {
        self.merge(other.acc())
    }
}

impl Accumulator for MeanAcc {
    type Snapshot = MeanResult;

    fn dimension(&self) -> Option<usize> {
        self.dim
    }

    fn count(&self) -> usize {
        self.count
    }

    fn add(&mut self, sample: &[f64]) -> Result<()> {
        check_dimension(self.dim, sample.len())?;
        if self.dim.is_none() {
            self.dim = Some(sample.len());
            self.sum = vec![0.0; sample.len()];
        }
        self.count += 1;
        for (s, &x) in self.sum.iter_mut().zip(sample) {
            *s += x;
        }
        Ok(())
    }

    fn result(&self) -> MeanResult {
        MeanResult::new(self.clone())
    }

    fn reset(&mut self) {
        self.count = 0;
        self.sum.iter_mut().for_each(|s| *s = 0.0);
    }
}

impl Merge for MeanAcc {
    fn merge(&mut self, other: &Self) -> Result<()> {
        let dim = merged_dimension(self.dim, other.dim)?;
        if self.dim.is_none() {
            self.sum = vec![0.0; dim.unwrap_or(0)];
            self.dim = dim;
        }
        self.count += other.count;
        for (s, &o) in self.sum.iter_mut().zip(&other.sum) {
            *s += o;
        }
        Ok(())
    }
}

impl HasMean for MeanAcc {
    fn mean(&self) -> Result<Vec<f64>> {
        require(1, self.count)?;
        let c = self.count as f64;
        Ok(self.sum.iter().map(|&s| s / c).collect())
    }
}
