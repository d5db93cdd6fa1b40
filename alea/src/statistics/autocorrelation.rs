use crate::config::BinningConfig;
use crate::error::{check_dimension, merged_dimension, AleaError, Result};

use super::result::AutocorrResult;
use super::traits::{Accumulator, HasMean, HasTau, HasVar, Merge};
use super::variance::VarAcc;

/// One rung of the binning ladder: moments of bins of `2^k` raw samples,
/// plus at most one bin value still waiting for its partner.
#[derive(Debug, Clone, PartialEq)]
struct Level {
    moments: VarAcc,
    pending: bool,
    carry: Vec<f64>,
}

impl Level {
    fn new(dim: usize) -> Self {
        Self {
            moments: VarAcc::new(dim),
            pending: false,
            carry: vec![0.0; dim],
        }
    }
}

/// Logarithmic binning accumulator.
///
/// Level 0 is an ordinary [`VarAcc`] over the raw samples and gives the naive
/// (uncorrelated) error. Every second value arriving at level `k` is averaged
/// with its predecessor and forwarded to level `k + 1`, so level `k` sees
/// bins of `2^k` consecutive samples. The growth of the bin variance with
/// `k` measures the integrated autocorrelation time.
///
/// The ladder is preallocated to `config.max_levels` rungs; values that would
/// climb above the top rung are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct AutocorrAcc {
    dim: Option<usize>,
    config: BinningConfig,
    levels: Vec<Level>,
    scratch: Vec<f64>,
}

impl Default for AutocorrAcc {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AutocorrAcc {
    /// A dimension of 0 defers sizing to the first sample.
    pub fn new(dim: usize) -> Self {
        let config = BinningConfig::default();
        let mut acc = Self {
            dim: None,
            config,
            levels: Vec::with_capacity(config.max_levels),
            scratch: Vec::new(),
        };
        if dim > 0 {
            acc.size_to(dim);
        }
        acc
    }

    pub fn with_config(dim: usize, config: BinningConfig) -> Result<Self> {
        config.check()?;
        let mut acc = Self {
            dim: None,
            config,
            levels: Vec::with_capacity(config.max_levels),
            scratch: Vec::new(),
        };
        if dim > 0 {
            acc.size_to(dim);
        }
        Ok(acc)
    }

    pub fn config(&self) -> &BinningConfig {
        &self.config
    }

    /// Number of ladder levels reached so far, including the raw level.
    pub fn nlevels(&self) -> usize {
        self.levels.len()
    }

    /// Bin count at each level reached so far.
    pub fn level_counts(&self) -> Vec<usize> {
        self.levels.iter().map(|l| l.moments.count()).collect()
    }

    pub fn merge_result(&mut self, other: &AutocorrResult) -> Result<()> {
        self.merge(other.acc())
    }

    /// Per usable level, per component, the tau estimate `0.5 * 2^k var_k / var_0`.
    ///
    /// A level is usable while it holds at least `config.min_bins` bins; at
    /// least one level beyond the raw samples must be usable.
    pub fn binning_curve(&self) -> Result<Vec<Vec<f64>>> {
        let usable = self
            .levels
            .iter()
            .take_while(|l| l.moments.count() >= self.config.min_bins)
            .count();
        if usable < 2 {
            return Err(AleaError::InsufficientData {
                required: 2 * self.config.min_bins,
                actual: self.count(),
            });
        }
        let base = &self.levels[0].moments;
        let d = base.running_mean().len();
        Ok(self.levels[..usable]
            .iter()
            .enumerate()
            .map(|(k, lvl)| {
                let bin = 2f64.powi(k as i32);
                (0..d)
                    .map(|i| {
                        let v0 = base.component_var(i);
                        if v0 > 0.0 {
                            0.5 * bin * lvl.moments.component_var(i) / v0
                        } else {
                            0.5
                        }
                    })
                    .collect()
            })
            .collect())
    }

    /// Drop pending carries. Used for snapshots, whose ladders only merge
    /// moments.
    pub(crate) fn without_carries(mut self) -> Self {
        for lvl in &mut self.levels {
            lvl.pending = false;
        }
        self
    }

    fn size_to(&mut self, dim: usize) {
        self.dim = Some(dim);
        self.levels.clear();
        self.levels.push(Level::new(dim));
        self.scratch = vec![0.0; dim];
    }

    /// Push one value into level `start` and carry paired bins upwards.
    fn feed(&mut self, start: usize, x: &[f64]) {
        let dim = x.len();
        self.scratch.copy_from_slice(x);
        let mut k = start;
        while k < self.config.max_levels {
            if k == self.levels.len() {
                self.levels.push(Level::new(dim));
            }
            let lvl = &mut self.levels[k];
            lvl.moments.absorb(&self.scratch);
            if !lvl.pending {
                lvl.carry.copy_from_slice(&self.scratch);
                lvl.pending = true;
                return;
            }
            for (s, &c) in self.scratch.iter_mut().zip(&lvl.carry) {
                *s = 0.5 * (c + *s);
            }
            lvl.pending = false;
            k += 1;
        }
    }
}

/// Without a plateau, only levels holding this many times `min_bins` bins
/// compete for the fallback estimate.
const FALLBACK_BIN_FACTOR: usize = 8;

/// Integrated autocorrelation time from one component's binning curve.
///
/// `bins[k]` is the number of bins behind `curve[k]`. The step from level `j`
/// to `j + 1` is stable when it changes the curve by at most
/// `max(tolerance, noise_sigmas * sqrt(2 / (bins[j + 1] - 1)))` relative to
/// `curve[j]`, the second term being the relative standard error of a variance
/// estimated from that many bins. The plateau starts at the first level whose
/// next `stable_levels` steps are all stable, and the estimate is read at the
/// end of that run.
///
/// Without a plateau the largest value among levels with at least
/// `8 * min_bins` bins is used, or the last level if none has that many.
pub fn plateau_tau(curve: &[f64], bins: &[usize], config: &BinningConfig) -> f64 {
    let n = curve.len().min(bins.len());
    let (curve, bins) = (&curve[..n], &bins[..n]);
    let Some(&last) = curve.last() else {
        return 0.5;
    };

    let stable = |j: usize| {
        let dof = bins[j + 1].saturating_sub(1).max(1) as f64;
        let allowed = config
            .tolerance
            .max(config.noise_sigmas * (2.0 / dof).sqrt());
        (curve[j + 1] - curve[j]).abs() <= allowed * curve[j].abs()
    };
    let s = config.stable_levels;
    if let Some(k) = (0..n.saturating_sub(s)).find(|&k| (k..k + s).all(stable)) {
        return curve[k + s];
    }

    let wide = FALLBACK_BIN_FACTOR * config.min_bins;
    let fallback = curve
        .iter()
        .zip(bins)
        .filter(|&(_, &b)| b >= wide)
        .map(|(&r, _)| r)
        .reduce(f64::max)
        .unwrap_or(last);
    tracing::debug!(
        levels = n,
        tau = fallback,
        "no binning plateau found, using largest well-populated level"
    );
    fallback
}

impl Accumulator for AutocorrAcc {
    type Snapshot = AutocorrResult;

    fn dimension(&self) -> Option<usize> {
        self.dim
    }

    fn count(&self) -> usize {
        self.levels.first().map_or(0, |l| l.moments.count())
    }

    fn add(&mut self, sample: &[f64]) -> Result<()> {
        check_dimension(self.dim, sample.len())?;
        if self.dim.is_none() {
            self.size_to(sample.len());
        }
        self.feed(0, sample);
        Ok(())
    }

    fn result(&self) -> AutocorrResult {
        AutocorrResult::new(self.clone().without_carries())
    }

    fn reset(&mut self) {
        if let Some(dim) = self.dim {
            self.size_to(dim);
        }
    }
}

/// Best-effort combination of two ladders.
///
/// Level 0 is merged exactly. Higher levels are merged rung by rung, and
/// carries pending on the same rung of both ladders are paired and pushed
/// up. The bins of the merged ladder do not line up with those of the
/// concatenated stream, so the resulting `tau` is an approximation.
impl Merge for AutocorrAcc {
    fn merge(&mut self, other: &Self) -> Result<()> {
        if self.config != other.config {
            return Err(AleaError::IncompatibleAccumulator(
                "binning configurations differ".into(),
            ));
        }
        let dim = merged_dimension(self.dim, other.dim)?;
        if let (None, Some(d)) = (self.dim, dim) {
            self.size_to(d);
        }
        if other.count() == 0 {
            return Ok(());
        }
        tracing::debug!(
            left = self.count(),
            right = other.count(),
            "merging binning ladders, levels above 0 are approximate"
        );

        for (k, theirs) in other.levels.iter().enumerate() {
            match self.levels.get_mut(k) {
                Some(ours) => ours.moments.combine(&theirs.moments),
                None => self.levels.push(Level {
                    pending: false,
                    ..theirs.clone()
                }),
            }
        }

        for (k, theirs) in other.levels.iter().enumerate() {
            if !theirs.pending {
                continue;
            }
            let ours = &mut self.levels[k];
            if ours.pending {
                ours.pending = false;
                let paired: Vec<f64> = ours
                    .carry
                    .iter()
                    .zip(&theirs.carry)
                    .map(|(a, b)| 0.5 * (a + b))
                    .collect();
                self.feed(k + 1, &paired);
            } else {
                ours.carry.copy_from_slice(&theirs.carry);
                ours.pending = true;
            }
        }
        Ok(())
    }
}

impl HasMean for AutocorrAcc {
    fn mean(&self) -> Result<Vec<f64>> {
        match self.levels.first() {
            Some(l) => l.moments.mean(),
            None => Err(AleaError::InsufficientData {
                required: 1,
                actual: 0,
            }),
        }
    }
}

impl HasVar for AutocorrAcc {
    /// Naive level-0 variance; the correlation correction is in `error()`.
    fn var(&self) -> Result<Vec<f64>> {
        match self.levels.first() {
            Some(l) => l.moments.var(),
            None => Err(AleaError::InsufficientData {
                required: 2,
                actual: 0,
            }),
        }
    }

    fn stderror(&self) -> Result<Vec<f64>> {
        self.error()
    }
}

impl HasTau for AutocorrAcc {
    fn tau(&self) -> Result<Vec<f64>> {
        let curve = self.binning_curve()?;
        let bins = self.level_counts();
        let d = curve[0].len();
        Ok((0..d)
            .map(|i| {
                let column: Vec<f64> = curve.iter().map(|row| row[i]).collect();
                plateau_tau(&column, &bins, &self.config)
            })
            .collect())
    }

    fn error(&self) -> Result<Vec<f64>> {
        let tau = self.tau()?;
        let var = self.var()?;
        let n = self.count() as f64;
        Ok(var
            .iter()
            .zip(&tau)
            .map(|(&v, &t)| (v * 2.0 * t / n).sqrt())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_counts_halve() {
        let mut acc = AutocorrAcc::new(1);
        for i in 0..10 {
            acc.add(&[i as f64]).unwrap();
        }
        assert_eq!(acc.level_counts(), vec![10, 5, 2, 1]);
    }

    #[test]
    fn test_pairs_are_averaged() {
        let mut acc = AutocorrAcc::new(1);
        acc.add_all([[1.0], [2.0], [3.0], [4.0]]).unwrap();
        let l1 = &acc.levels[1].moments;
        assert_eq!(l1.count(), 2);
        assert!((l1.mean().unwrap()[0] - 2.5).abs() < 1e-12);
        assert!((l1.var().unwrap()[0] - 2.0).abs() < 1e-12);
        assert_eq!(acc.levels[2].moments.mean().unwrap(), vec![2.5]);
        assert!(acc.levels[2].pending);
    }

    #[test]
    fn test_ladder_capped_at_max_levels() {
        let config = BinningConfig {
            max_levels: 3,
            ..BinningConfig::default()
        };
        let mut acc = AutocorrAcc::with_config(1, config).unwrap();
        for i in 0..64 {
            acc.add(&[i as f64]).unwrap();
        }
        assert_eq!(acc.level_counts(), vec![64, 32, 16]);
    }

    #[test]
    fn test_invalid_config() {
        let config = BinningConfig {
            min_bins: 0,
            ..BinningConfig::default()
        };
        assert!(matches!(
            AutocorrAcc::with_config(1, config),
            Err(AleaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_tau_needs_one_usable_level() {
        let mut acc = AutocorrAcc::new(1);
        for i in 0..31 {
            acc.add(&[(i % 3) as f64]).unwrap();
        }
        assert_eq!(
            acc.tau(),
            Err(AleaError::InsufficientData {
                required: 32,
                actual: 31
            })
        );
        assert!(acc.var().is_ok());
        acc.add(&[0.0]).unwrap();
        assert!(acc.tau().is_ok());
    }

    #[test]
    fn test_constant_component() {
        let mut acc = AutocorrAcc::new(2);
        for i in 0..256 {
            acc.add(&[1.0, (i % 2) as f64]).unwrap();
        }
        let tau = acc.tau().unwrap();
        assert_eq!(tau[0], 0.5);
        assert_eq!(acc.error().unwrap()[0], 0.0);
        // Strictly alternating values cancel in every pair.
        assert!(tau[1] < 0.01);
    }

    #[test]
    fn test_blocked_sequence_is_correlated() {
        // Each pseudo-random value repeated 8 times.
        let mut state = 12345u64;
        let mut acc = AutocorrAcc::new(1);
        for _ in 0..2048 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = (state >> 11) as f64 / (1u64 << 53) as f64;
            for _ in 0..8 {
                acc.add(&[x]).unwrap();
            }
        }
        // Bins of 8 or more are uncorrelated: 2 tau = 8.
        let tau = acc.tau().unwrap()[0];
        assert!((tau - 4.0).abs() < 1.0, "tau = {tau}");
        let naive = (acc.var().unwrap()[0] / acc.count() as f64).sqrt();
        assert!(acc.error().unwrap()[0] > 2.0 * naive);
    }

    #[test]
    fn test_plateau_tau() {
        let config = BinningConfig::default();
        let many = [1 << 20; 7];
        let curve = [0.5, 1.0, 2.0, 2.9, 3.0, 3.05, 3.1];
        assert_eq!(plateau_tau(&curve, &many, &config), 3.05);
        let rising = [0.5, 1.0, 2.0, 4.0];
        assert_eq!(plateau_tau(&rising, &many, &config), 4.0);
        assert_eq!(plateau_tau(&[], &[], &config), 0.5);
    }

    #[test]
    fn test_plateau_tau_allows_bin_noise() {
        // rho = 0.9 AR(1) over 2^17 samples, true tau 9.5. The steps past
        // level 7 are within the noise of a few hundred bins.
        let curve = [
            0.50, 0.95, 1.77, 3.11, 4.95, 6.78, 7.99, 8.85, 9.60, 10.38, 10.54, 13.77, 18.50,
            26.25,
        ];
        let bins: Vec<usize> = (0..curve.len()).map(|k| 1 << (17 - k)).collect();
        let config = BinningConfig::default();
        assert_eq!(plateau_tau(&curve, &bins, &config), 10.38);

        let strict = BinningConfig {
            noise_sigmas: 0.0,
            ..config
        };
        // Fallback ignores the sparsely populated top levels.
        assert_eq!(plateau_tau(&curve, &bins, &strict), 10.54);
    }

    #[test]
    fn test_plateau_fallback_without_wide_levels() {
        let config = BinningConfig::default();
        let rising = [0.5, 1.0, 2.0, 4.0];
        assert_eq!(plateau_tau(&rising, &[64, 32, 16, 8], &config), 4.0);
    }

    #[test]
    fn test_failed_add_leaves_ladder() {
        let mut acc = AutocorrAcc::new(2);
        acc.add_all([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let before = acc.clone();
        assert!(acc.add(&[1.0]).is_err());
        assert_eq!(acc, before);
    }

    #[test]
    fn test_merge_level0_exact() {
        let xs: Vec<f64> = (0..300).map(|i| ((i * 7919) % 101) as f64).collect();
        let mut a = AutocorrAcc::new(1);
        let mut b = AutocorrAcc::new(1);
        let mut whole = AutocorrAcc::new(1);
        xs[..123].iter().for_each(|&x| a.add(&[x]).unwrap());
        xs[123..].iter().for_each(|&x| b.add(&[x]).unwrap());
        xs.iter().for_each(|&x| whole.add(&[x]).unwrap());

        a.merge(&b).unwrap();
        assert_eq!(a.count(), 300);
        assert!((a.mean().unwrap()[0] - whole.mean().unwrap()[0]).abs() < 1e-9);
        assert!((a.var().unwrap()[0] - whole.var().unwrap()[0]).abs() < 1e-9);
        // 61 + 88 bins, plus the two pending carries paired into one bin.
        assert_eq!(a.level_counts()[1], 150);
    }

    #[test]
    fn test_merge_rejects_other_config() {
        let mut a = AutocorrAcc::new(1);
        let b = AutocorrAcc::with_config(
            1,
            BinningConfig {
                tolerance: 0.1,
                ..BinningConfig::default()
            },
        )
        .unwrap();
        assert!(matches!(
            a.merge(&b),
            Err(AleaError::IncompatibleAccumulator(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut acc = AutocorrAcc::new(1);
        acc.add_all([[1.0], [2.0], [3.0]]).unwrap();
        acc.reset();
        assert_eq!(acc.count(), 0);
        assert_eq!(acc.nlevels(), 1);
        assert_eq!(acc, AutocorrAcc::new(1));
    }
}
