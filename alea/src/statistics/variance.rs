use crate::error::{check_dimension, merged_dimension, require, Result};

use super::result::VarResult;
use super::traits::{Accumulator, HasMean, HasVar, Merge};

/// Running mean and second central moment per component (Welford).
///
/// `m2[i]` is the sum of squared deviations from the running mean; the
/// variance is never formed as `E[x^2] - E[x]^2`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarAcc {
    dim: Option<usize>,
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl VarAcc {
    /// A dimension of 0 defers sizing to the first sample.
    pub fn new(dim: usize) -> Self {
        Self {
            dim: (dim > 0).then_some(dim),
            count: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
        }
    }

    pub fn merge_result(&mut self, other: &VarResult) -> Result<()> {
        self.merge(other.acc())
    }

    fn size_to(&mut self, dim: usize) {
        self.dim = Some(dim);
        self.mean = vec![0.0; dim];
        self.m2 = vec![0.0; dim];
    }

    /// Welford update without the dimension check.
    pub(crate) fn absorb(&mut self, x: &[f64]) {
        self.count += 1;
        let n = self.count as f64;
        for ((m, q), &xi) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(x) {
            let delta = xi - *m;
            *m += delta / n;
            *q += delta * (xi - *m);
        }
    }

    /// Chan et al. pairwise combination of two `(N, mean, M2)` triples.
    pub(crate) fn combine(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            self.count = other.count;
            self.mean.copy_from_slice(&other.mean);
            self.m2.copy_from_slice(&other.m2);
            return;
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        for i in 0..self.mean.len() {
            let delta = other.mean[i] - self.mean[i];
            self.mean[i] += delta * nb / n;
            self.m2[i] += other.m2[i] + delta * delta * na * nb / n;
        }
        self.count += other.count;
    }

    pub(crate) fn running_mean(&self) -> &[f64] {
        &self.mean
    }

    /// Unbiased variance of component `i`, assuming `count >= 2`.
    pub(crate) fn component_var(&self, i: usize) -> f64 {
        self.m2[i] / (self.count - 1) as f64
    }
}

impl Accumulator for VarAcc {
    type Snapshot = VarResult;

    fn dimension(&self) -> Option<usize> {
        self.dim
    }

    fn count(&self) -> usize {
        self.count
    }

    fn add(&mut self, sample: &[f64]) -> Result<()> {
        check_dimension(self.dim, sample.len())?;
        if self.dim.is_none() {
            self.size_to(sample.len());
        }
        self.absorb(sample);
        Ok(())
    }

    fn result(&self) -> VarResult {
        VarResult::new(self.clone())
    }

    fn reset(&mut self) {
        self.count = 0;
        self.mean.iter_mut().for_each(|m| *m = 0.0);
        self.m2.iter_mut().for_each(|q| *q = 0.0);
    }
}

impl Merge for VarAcc {
    fn merge(&mut self, other: &Self) -> Result<()> {
        let dim = merged_dimension(self.dim, other.dim)?;
        if let (None, Some(d)) = (self.dim, dim) {
            self.size_to(d);
        }
        self.combine(other);
        Ok(())
    }
}

impl HasMean for VarAcc {
    fn mean(&self) -> Result<Vec<f64>> {
        require(1, self.count)?;
        Ok(self.mean.clone())
    }
}

impl HasVar for VarAcc {
    fn var(&self) -> Result<Vec<f64>> {
        require(2, self.count)?;
        Ok((0..self.mean.len()).map(|i| self.component_var(i)).collect())
    }

    fn stderror(&self) -> Result<Vec<f64>> {
        let n = self.count as f64;
        Ok(self.var()?.into_iter().map(|v| (v / n).sqrt()).collect())
    }
}
