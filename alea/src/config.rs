use validator::{Validate, ValidationError};

use crate::error::AleaError;

/// Fixed batch size for [`BatchAcc`](crate::BatchAcc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct BatchConfig {
    #[validate(range(min = 1))]
    pub batch_size: usize,
}

impl BatchConfig {
    pub fn new(batch_size: usize) -> crate::Result<Self> {
        let cfg = Self { batch_size };
        cfg.check()?;
        Ok(cfg)
    }

    pub(crate) fn check(&self) -> crate::Result<()> {
        self.validate()
            .map_err(|e| AleaError::InvalidConfiguration(format!("batch_size: {e}")))
    }
}

fn validate_binning_config(cfg: &BinningConfig) -> Result<(), ValidationError> {
    if !cfg.tolerance.is_finite() || cfg.tolerance <= 0.0 || cfg.tolerance >= 1.0 {
        return Err(ValidationError::new("tolerance must be in (0, 1)"));
    }
    if !cfg.noise_sigmas.is_finite() || cfg.noise_sigmas < 0.0 {
        return Err(ValidationError::new("noise_sigmas must be finite and >= 0"));
    }
    if cfg.stable_levels < 1 {
        return Err(ValidationError::new("stable_levels must be >= 1"));
    }
    if cfg.min_bins < 2 {
        return Err(ValidationError::new("min_bins must be >= 2"));
    }
    if !(2..=64).contains(&cfg.max_levels) {
        return Err(ValidationError::new("max_levels must be in 2..=64"));
    }
    Ok(())
}

/// Plateau policy and ladder capacity for [`AutocorrAcc`](crate::AutocorrAcc).
///
/// Level `k` of the ladder holds bins of `2^k` raw samples. Its normalized
/// ratio `r_k = 2^k var_k / var_0` grows towards `2 tau` and flattens once the
/// bins are longer than the correlation time; `tolerance`, `noise_sigmas`
/// and `stable_levels` decide when it counts as flat.
#[derive(Debug, Clone, Copy, PartialEq, Validate)]
#[validate(schema(function = "validate_binning_config"))]
pub struct BinningConfig {
    /// Largest relative change of `r_k` between consecutive levels that still
    /// counts as stable.
    pub tolerance: f64,
    /// Widens the stable band to this many standard errors of a variance
    /// estimated from the level's bin count. Sparse levels fluctuate by far
    /// more than `tolerance`; 0 disables the widening.
    pub noise_sigmas: f64,
    /// Number of consecutive stable comparisons that make a plateau.
    pub stable_levels: usize,
    /// A level only takes part in tau estimation with at least this many bins.
    pub min_bins: usize,
    /// Ladder capacity; bins never exceed `2^(max_levels - 1)` samples.
    pub max_levels: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.05,
            noise_sigmas: 2.0,
            stable_levels: 2,
            min_bins: 16,
            max_levels: 32,
        }
    }
}

impl BinningConfig {
    pub(crate) fn check(&self) -> crate::Result<()> {
        self.validate()
            .map_err(|e| AleaError::InvalidConfiguration(format!("{e}")))
    }
}
