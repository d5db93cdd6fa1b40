//! Immutable snapshots of accumulators.
//!
//! A result owns a private copy of the sufficient statistics it was taken
//! from, exposes the queries of its kind, and can be merged with results of
//! the same kind (or absorbed by a live accumulator via `merge_result`).

use crate::error::Result;

use super::traits::{Accumulator, HasCov, HasMean, HasTau, HasVar, Merge};
use super::{AutocorrAcc, BatchAcc, CovAcc, MeanAcc, VarAcc};

macro_rules! snapshot {
    ($(#[$doc:meta])* $name:ident, $acc:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            acc: $acc,
        }

        impl $name {
            pub(crate) fn new(acc: $acc) -> Self {
                Self { acc }
            }

            pub(crate) fn acc(&self) -> &$acc {
                &self.acc
            }

            pub fn count(&self) -> usize {
                self.acc.count()
            }

            pub fn dimension(&self) -> Option<usize> {
                self.acc.dimension()
            }
        }

        impl Merge for $name {
            fn merge(&mut self, other: &Self) -> Result<()> {
                self.acc.merge(&other.acc)
            }
        }

        impl HasMean for $name {
            fn mean(&self) -> Result<Vec<f64>> {
                self.acc.mean()
            }
        }
    };
}

macro_rules! delegate_var {
    ($name:ident) => {
        impl HasVar for $name {
            fn var(&self) -> Result<Vec<f64>> {
                self.acc.var()
            }

            fn stderror(&self) -> Result<Vec<f64>> {
                self.acc.stderror()
            }
        }
    };
}

snapshot!(MeanResult, MeanAcc);

snapshot!(VarResult, VarAcc);
delegate_var!(VarResult);

snapshot!(CovResult, CovAcc);
delegate_var!(CovResult);

impl HasCov for CovResult {
    fn cov(&self) -> Result<Vec<Vec<f64>>> {
        self.acc.cov()
    }
}

snapshot!(
    /// Ladder moments without pending carries; merging two of these
    /// combines the levels rung by rung.
    ///
    /// Bins still waiting for a partner are lost, so the upper levels of a
    /// merged snapshot hold fewer bins than those of merged accumulators.
    /// With many small parts the sparse top levels can shift `tau` well
    /// away from the accumulator-merged value; merge the accumulators
    /// themselves when `tau` matters.
    AutocorrResult,
    AutocorrAcc
);
delegate_var!(AutocorrResult);

impl HasTau for AutocorrResult {
    fn tau(&self) -> Result<Vec<f64>> {
        self.acc.tau()
    }

    fn error(&self) -> Result<Vec<f64>> {
        self.acc.error()
    }
}

impl AutocorrResult {
    pub fn binning_curve(&self) -> Result<Vec<Vec<f64>>> {
        self.acc.binning_curve()
    }

    pub fn nlevels(&self) -> usize {
        self.acc.nlevels()
    }
}

snapshot!(
    /// Batch-mean statistics; the partial batch is kept only so that merges
    /// can pool it.
    BatchResult,
    BatchAcc
);
delegate_var!(BatchResult);

impl BatchResult {
    pub fn batch_size(&self) -> usize {
        self.acc.batch_size()
    }

    pub fn num_batches(&self) -> usize {
        self.acc.num_batches()
    }
}
