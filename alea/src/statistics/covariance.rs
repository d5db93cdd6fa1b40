use crate::error::{check_dimension, merged_dimension, require, Result};

use super::result::CovResult;
use super::traits::{Accumulator, HasCov, HasMean, HasVar, Merge};

/// Running mean and full co-moment matrix.
///
/// Only the upper triangle of `m2` (row-major, `dim * dim`) is updated; the
/// lower triangle is mirrored on output so the returned matrix is exactly
/// symmetric. Diagonal entries follow the same recurrence as [`VarAcc`],
/// so `cov()[i][i] == var()[i]` bit for bit.
///
/// [`VarAcc`]: super::VarAcc
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CovAcc {
    dim: Option<usize>,
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl CovAcc {
    /// A dimension of 0 defers sizing to the first sample.
    pub fn new(dim: usize) -> Self {
        Self {
            dim: (dim > 0).then_some(dim),
            count: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim * dim],
        }
    }

    pub fn merge_result(&mut self, other: &CovResult) -> Result<()> {
        self.merge(other.acc())
    }

    fn size_to(&mut self, dim: usize) {
        self.dim = Some(dim);
        self.mean = vec![0.0; dim];
        self.m2 = vec![0.0; dim * dim];
    }

    fn unbiased(&self, i: usize, j: usize) -> f64 {
        let d = self.mean.len();
        let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
        self.m2[lo * d + hi] / (self.count - 1) as f64
    }
}

impl Accumulator for CovAcc {
    type Snapshot = CovResult;

    fn dimension(&self) -> Option<usize> {
        self.dim
    }

    fn count(&self) -> usize {
        self.count
    }

    fn add(&mut self, x: &[f64]) -> Result<()> {
        check_dimension(self.dim, x.len())?;
        if self.dim.is_none() {
            self.size_to(x.len());
        }
        self.count += 1;
        let n = self.count as f64;
        let d = self.mean.len();
        for i in 0..d {
            let di = x[i] - self.mean[i];
            for j in i..d {
                let dj = x[j] - self.mean[j];
                self.m2[i * d + j] += di * (x[j] - (self.mean[j] + dj / n));
            }
        }
        for (m, &xi) in self.mean.iter_mut().zip(x) {
            *m += (xi - *m) / n;
        }
        Ok(())
    }

    fn result(&self) -> CovResult {
        CovResult::new(self.clone())
    }

    fn reset(&mut self) {
        self.count = 0;
        self.mean.iter_mut().for_each(|m| *m = 0.0);
        self.m2.iter_mut().for_each(|q| *q = 0.0);
    }
}

impl Merge for CovAcc {
    fn merge(&mut self, other: &Self) -> Result<()> {
        let dim = merged_dimension(self.dim, other.dim)?;
        if let (None, Some(d)) = (self.dim, dim) {
            self.size_to(d);
        }
        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            self.count = other.count;
            self.mean.copy_from_slice(&other.mean);
            self.m2.copy_from_slice(&other.m2);
            return Ok(());
        }
        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let d = self.mean.len();
        let delta: Vec<f64> = other
            .mean
            .iter()
            .zip(&self.mean)
            .map(|(b, a)| b - a)
            .collect();
        for i in 0..d {
            for j in i..d {
                self.m2[i * d + j] += other.m2[i * d + j] + delta[i] * delta[j] * na * nb / n;
            }
        }
        for (m, &dm) in self.mean.iter_mut().zip(&delta) {
            *m += dm * nb / n;
        }
        self.count += other.count;
        Ok(())
    }
}

impl HasMean for CovAcc {
    fn mean(&self) -> Result<Vec<f64>> {
        require(1, self.count)?;
        Ok(self.mean.clone())
    }
}

impl HasVar for CovAcc {
    fn var(&self) -> Result<Vec<f64>> {
        require(2, self.count)?;
        Ok((0..self.mean.len()).map(|i| self.unbiased(i, i)).collect())
    }

    fn stderror(&self) -> Result<Vec<f64>> {
        let n = self.count as f64;
        Ok(self.var()?.into_iter().map(|v| (v / n).sqrt()).collect())
    }
}

impl HasCov for CovAcc {
    fn cov(&self) -> Result<Vec<Vec<f64>>> {
        require(2, self.count)?;
        let d = self.mean.len();
        Ok((0..d)
            .map(|i| (0..d).map(|j| self.unbiased(i, j)).collect())
            .collect())
    }
}
