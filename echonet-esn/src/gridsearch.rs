use std::time::Instant;

use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use echonet_data::models::Dataset;

use crate::config::{EsnConfig, GridSearchResults, TrialResult};
use crate::training::train_and_evaluate;

/// Hyperparameter values swept by the grid. Everything else comes from the
/// base configuration.
#[derive(Debug, Clone)]
pub struct GridAxes {
    pub spectral_radii: Vec<f64>,
    pub leaking_rates: Vec<f64>,
    pub input_scalings: Vec<f64>,
    pub reservoir_sizes: Vec<usize>,
}

impl Default for GridAxes {
    fn default() -> Self {
        Self {
            spectral_radii: vec![0.5, 0.8, 1.0, 1.2, 1.5],
            leaking_rates: vec![0.1, 0.3, 0.5, 0.8, 1.0],
            input_scalings: vec![0.01, 0.05, 0.1, 0.5],
            reservoir_sizes: vec![50, 100, 200],
        }
    }
}

impl GridAxes {
    pub fn len(&self) -> usize {
        self.spectral_radii.len()
            * self.leaking_rates.len()
            * self.input_scalings.len()
            * self.reservoir_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cartesian product of `axes`, spectral radius outermost, reservoir size innermost.
pub fn generate_grid(base: &EsnConfig, axes: &GridAxes) -> Vec<EsnConfig> {
    let mut configs = Vec::with_capacity(axes.len());

    for &spectral_radius in &axes.spectral_radii {
        for &leaking_rate in &axes.leaking_rates {
            for &input_scaling in &axes.input_scalings {
                for &reservoir_size in &axes.reservoir_sizes {
                    configs.push(EsnConfig {
                        spectral_radius,
                        leaking_rate,
                        input_scaling,
                        reservoir_size,
                        ..base.clone()
                    });
                }
            }
        }
    }

    configs
}

/// One-line summary used in experiment logs.
pub fn describe(trial: &TrialResult) -> String {
    let c = &trial.config;
    format!(
        "rho(W)={}, alpha={}, Win scale={}, Res Size={} -> NRMSE: {}",
        c.spectral_radius, c.leaking_rate, c.input_scaling, c.reservoir_size, trial.nrmse
    )
}

/// Train and score every configuration in parallel. Each trial owns its own
/// seeded engine. Failed trials are logged and skipped.
pub fn run_grid_search(dataset: &Dataset, configs: &[EsnConfig]) -> Result<GridSearchResults> {
    let pb = ProgressBar::new(configs.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        )?
        .progress_chars("=> "),
    );

    let start = Instant::now();

    let mut results: Vec<TrialResult> = configs
        .par_iter()
        .filter_map(|config| {
            let trial_start = Instant::now();
            let outcome = train_and_evaluate(config, dataset);
            pb.inc(1);
            match outcome {
                Ok((_, evaluation)) => Some(TrialResult {
                    config: config.clone(),
                    nrmse: evaluation.nrmse,
                    train_time_ms: trial_start.elapsed().as_millis() as u64,
                }),
                Err(e) => {
                    log::warn!("Config failed: {:?}: {}", config, e);
                    None
                }
            }
        })
        .collect();

    pb.finish_and_clear();

    let elapsed = start.elapsed().as_secs();
    log::info!(
        "Grid search finished: {}/{} configs in {}m{:02}s",
        results.len(),
        configs.len(),
        elapsed / 60,
        elapsed % 60
    );

    if results.is_empty() {
        bail!("All {} configurations failed", configs.len());
    }

    // Diverged trials (NaN/inf) sort last
    results.sort_by(|a, b| rank_key(a.nrmse).total_cmp(&rank_key(b.nrmse)));

    let best = &results[0];
    Ok(GridSearchResults {
        best_config: best.config.clone(),
        best_nrmse: best.nrmse,
        results,
    })
}

fn rank_key(nrmse: f64) -> f64 {
    if nrmse.is_finite() {
        nrmse
    } else {
        f64::INFINITY
    }
}
