use std::time::Instant;

use alea::{
    merge_all, Accumulator, AutocorrAcc, BatchAcc, CovAcc, HasCov, HasMean, HasTau, HasVar,
    Merge,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;

const N_CHAINS: usize = 8;
const N_SWEEPS: usize = 200_000;
const WARMUP_SWEEPS: usize = 2_000;
const STEP: f64 = 0.8;
const RHO: f64 = 0.8;
const BATCH_SIZE: usize = 1_000;

/// Per-chain accumulators for the 2-D observable `(x, y)`.
#[derive(Clone)]
struct ChainStats {
    cov: CovAcc,
    autocorr: AutocorrAcc,
    batch: BatchAcc,
}

impl Merge for ChainStats {
    fn merge(&mut self, other: &Self) -> alea::Result<()> {
        self.cov.merge(&other.cov)?;
        self.autocorr.merge(&other.autocorr)?;
        self.batch.merge(&other.batch)
    }
}

fn log_density(p: [f64; 2]) -> f64 {
    let [x, y] = p;
    -0.5 * (x * x - 2.0 * RHO * x * y + y * y) / (1.0 - RHO * RHO)
}

fn run_chain(seed: u64, pb: &ProgressBar) -> alea::Result<ChainStats> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut stats = ChainStats {
        cov: CovAcc::new(2),
        autocorr: AutocorrAcc::new(2),
        batch: BatchAcc::new(2, BATCH_SIZE)?,
    };

    let mut pos = [0.0, 0.0];
    let mut logp = log_density(pos);
    for sweep_id in 0..N_SWEEPS {
        let trial = [
            pos[0] + STEP * (2.0 * rng.gen::<f64>() - 1.0),
            pos[1] + STEP * (2.0 * rng.gen::<f64>() - 1.0),
        ];
        let trial_logp = log_density(trial);
        if rng.gen::<f64>().ln() < trial_logp - logp {
            pos = trial;
            logp = trial_logp;
        }
        if sweep_id >= WARMUP_SWEEPS {
            stats.cov.add(&pos)?;
            stats.autocorr.add(&pos)?;
            stats.batch.add(&pos)?;
        }
        if sweep_id % 1_000 == 0 {
            pb.inc(1_000);
        }
    }
    Ok(stats)
}

fn main() -> alea::Result<()> {
    let pb = ProgressBar::new((N_CHAINS * N_SWEEPS) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} [{elapsed_precise} < {eta_precise}, {per_sec}]",
        )
        .unwrap()
        .progress_chars("=> "),
    );
    pb.set_message("sweeps");

    let t0 = Instant::now();
    let chains: Vec<ChainStats> = (0..N_CHAINS)
        .into_par_iter()
        .map(|i| run_chain(42 + i as u64, &pb))
        .collect::<alea::Result<_>>()?;
    pb.finish();

    let Some(total) = merge_all(&chains, false)? else {
        return Ok(());
    };

    println!(
        "Chains: {}  |  Sweeps: {}  |  Samples: {}  |  {:.2} s",
        N_CHAINS,
        N_SWEEPS,
        total.cov.count(),
        t0.elapsed().as_secs_f64()
    );
    println!("{}", "-".repeat(70));

    let mean = total.cov.mean()?;
    let cov = total.cov.cov()?;
    let naive = total.cov.stderror()?;
    let tau = total.autocorr.tau()?;
    let error = total.autocorr.error()?;
    let batch_error = total.batch.stderror()?;
    for k in 0..2 {
        println!(
            "x{k}: mean {:+.5}  var {:.4}  naive {:.2e}  tau {:6.2}  binned {:.2e}  batched {:.2e}",
            mean[k], cov[k][k], naive[k], tau[k], error[k], batch_error[k]
        );
    }
    println!("cov(x0, x1) = {:.4}  (target {RHO})", cov[0][1]);
    Ok(())
}
