#![allow(dead_code)]

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_xoshiro::Xoshiro256StarStar;

pub const TWOGAUSS_COUNT: usize = 1024;

/// Paired Gaussian reference samples: component 1 is correlated with
/// component 0.
pub fn twogauss() -> Vec<[f64; 2]> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(42);
    let x = Normal::new(1.5, 2.0).unwrap();
    let noise = Normal::new(0.0, 0.5).unwrap();
    (0..TWOGAUSS_COUNT)
        .map(|_| {
            let a: f64 = x.sample(&mut rng);
            [a, -0.5 + 0.3 * a + noise.sample(&mut rng)]
        })
        .collect()
}

/// i.i.d. standard normal scalars.
pub fn white_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

/// AR(1) chain `x_t = rho x_{t-1} + sqrt(1 - rho^2) e_t`, whose integrated
/// autocorrelation time is `0.5 (1 + rho) / (1 - rho)`.
pub fn ar1(n: usize, rho: f64, seed: u64) -> Vec<f64> {
    let scale = (1.0 - rho * rho).sqrt();
    let mut x = 0.0;
    white_noise(n, seed)
        .into_iter()
        .map(|e| {
            x = rho * x + scale * e;
            x
        })
        .collect()
}

/// Two-pass mean and unbiased variance per component.
pub fn reference_moments(xs: &[[f64; 2]]) -> ([f64; 2], [f64; 2]) {
    let n = xs.len() as f64;
    let mut mean = [0.0; 2];
    for x in xs {
        for k in 0..2 {
            mean[k] += x[k];
        }
    }
    mean.iter_mut().for_each(|m| *m /= n);
    let mut var = [0.0; 2];
    for x in xs {
        for k in 0..2 {
            var[k] += (x[k] - mean[k]).powi(2);
        }
    }
    var.iter_mut().for_each(|v| *v /= n - 1.0);
    (mean, var)
}

pub fn assert_close(got: f64, expected: f64, tol: f64) {
    assert!(
        (got - expected).abs() <= tol,
        "got {got}, expected {expected} (tol {tol})"
    );
}

pub fn assert_rel_close(got: f64, expected: f64, rel: f64) {
    let tol = rel * expected.abs().max(1.0);
    assert_close(got, expected, tol);
}
