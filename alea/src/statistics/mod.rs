pub mod autocorrelation;
pub mod batch;
pub mod covariance;
pub mod mean;
pub mod result;
pub mod traits;
pub mod variance;

pub use autocorrelation::{plateau_tau, AutocorrAcc};
pub use batch::BatchAcc;
pub use covariance::CovAcc;
pub use mean::MeanAcc;
pub use result::{AutocorrResult, BatchResult, CovResult, MeanResult, VarResult};
pub use traits::{Accumulator, HasCov, HasMean, HasTau, HasVar, Merge};
pub use variance::VarAcc;
