//! Streaming accumulators for vector-valued Monte Carlo observables.
//!
//! Each accumulator absorbs fixed-dimension samples one at a time and keeps
//! only sufficient statistics:
//!
//! - [`MeanAcc`]: count and per-component sum
//! - [`VarAcc`]: Welford mean and second moment
//! - [`CovAcc`]: full co-moment matrix
//! - [`AutocorrAcc`]: logarithmic binning ladder for the autocorrelation time
//! - [`BatchAcc`]: fixed-size batch means
//!
//! Accumulators from independent workers combine through [`Merge`], and any
//! of them can be frozen into a result snapshot with
//! [`Accumulator::result`].
//!
//! ```
//! use alea::{Accumulator, HasMean, HasVar, Merge, VarAcc};
//!
//! let mut a = VarAcc::new(2);
//! let mut b = VarAcc::new(2);
//! a.add_all([[1.0, 10.0], [2.0, 20.0]]).unwrap();
//! b.add_all([[3.0, 30.0], [4.0, 40.0]]).unwrap();
//! a.merge(&b).unwrap();
//! assert_eq!(a.mean().unwrap(), vec![2.5, 25.0]);
//! assert!((a.var().unwrap()[0] - 5.0 / 3.0).abs() < 1e-12);
//! ```

pub mod config;
pub mod error;
pub mod reduce;
pub mod statistics;

pub use config::{BatchConfig, BinningConfig};
pub use error::{AleaError, Result};
pub use reduce::merge_all;
pub use statistics::{
    plateau_tau, Accumulator, AutocorrAcc, AutocorrResult, BatchAcc, BatchResult, CovAcc,
    CovResult, HasCov, HasMean, HasTau, HasVar, MeanAcc, MeanResult, Merge, VarAcc, VarResult,
};
