use anyhow::{anyhow, bail, Result};
use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::models::Dataset;

// x[t+1] = ALPHA*x[t] + BETA*x[t]*sum(x[t-N+1..=t]) + GAMMA*u[t-N+1]*u[t] + DELTA
const ALPHA: f64 = 0.3;
const BETA: f64 = 0.05;
const GAMMA: f64 = 1.5;
const DELTA: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct NarmaParams {
    /// System order N (10 for NARMA-10).
    pub order: usize,
    pub num_samples: usize,
    /// Half-open range the inputs are drawn from.
    pub input_range: (f64, f64),
    /// `None` derives a seed from the clock.
    pub seed: Option<u64>,
}

impl Default for NarmaParams {
    fn default() -> Self {
        Self {
            order: 10,
            num_samples: 2000,
            input_range: (0.0, 0.5),
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NarmaSeries {
    pub dataset: Dataset,
    pub seed: u64,
    /// True when the seed was not supplied and had to be generated.
    pub generated_seed: bool,
}

pub fn dataset_name(order: usize, num_samples: usize, seed: u64) -> String {
    format!("NARMA{order}_{num_samples}_seed{seed}")
}

fn clock_seed() -> u64 {
    let micros = chrono::Utc::now().timestamp_micros().unsigned_abs();
    micros % (i32::MAX as u64)
}

/// Generate a NARMA-N benchmark sequence.
pub fn generate(params: &NarmaParams) -> Result<NarmaSeries> {
    let n = params.order;
    let len = params.num_samples;
    let (lo, hi) = params.input_range;

    if n == 0 {
        bail!("NARMA order must be at least 1");
    }
    if len <= n + 1 {
        bail!("Need more than {} samples for NARMA{n}, got {len}", n + 1);
    }
    if !(lo < hi) {
        bail!("Empty input range [{lo}, {hi})");
    }

    let (seed, generated_seed) = match params.seed {
        Some(s) => (s, false),
        None => (clock_seed(), true),
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let dist = Uniform::new(lo, hi).map_err(|e| anyhow!("Invalid input range: {e}"))?;
    let u: Vec<f64> = (0..len).map(|_| rng.sample(dist)).collect();

    let mut x = vec![0.0; len];
    for t in n..len - 1 {
        let window: f64 = x[t + 1 - n..=t].iter().sum();
        x[t + 1] = ALPHA * x[t] + BETA * x[t] * window + GAMMA * u[t + 1 - n] * u[t] + DELTA;
    }

    if let Some(t) = x.iter().position(|v| !v.is_finite()) {
        log::warn!("NARMA{n} series diverged at step {t} (seed {seed})");
    }

    let dataset = Dataset::from_series(dataset_name(n, len, seed), &u, &x)?;
    log::debug!("Generated {} ({} samples)", dataset.name, dataset.len());

    Ok(NarmaSeries {
        dataset,
        seed,
        generated_seed,
    })
}
