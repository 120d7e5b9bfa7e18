use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use echonet_data::narma::{self, NarmaParams};
use echonet_data::store;

use echonet_esn::config::{Activation, EsnConfig, SpectralMethod};
use echonet_esn::display;
use echonet_esn::gridsearch::{self, GridAxes};
use echonet_esn::training;

#[derive(Parser)]
#[command(name = "echonet-esn", about = "Echo State Network benchmarks on NARMA series")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Overrides applied on top of the default or `--config` configuration.
#[derive(Args, Debug, Clone, Default)]
struct HyperParams {
    #[arg(long)]
    reservoir_size: Option<usize>,
    #[arg(long)]
    spectral_radius: Option<f64>,
    #[arg(long)]
    leaking_rate: Option<f64>,
    /// Expected fraction of reservoir weights kept
    #[arg(long)]
    sparsity: Option<f64>,
    #[arg(long)]
    input_scaling: Option<f64>,
    /// tanh or relu; any other tag runs without activation
    #[arg(long)]
    activation: Option<String>,
    #[arg(long)]
    ridge_alpha: Option<f64>,
    /// Centre states and targets before the readout fit (intercept is not kept)
    #[arg(long)]
    fit_intercept: Option<bool>,
    #[arg(long)]
    washout: Option<usize>,
    #[arg(long)]
    spectral_method: Option<SpectralMethod>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a NARMA-N benchmark dataset as CSV
    Generate {
        #[arg(long, default_value = "10")]
        order: usize,
        #[arg(long, default_value = "2000")]
        num_samples: usize,
        #[arg(long, default_value = "0.0")]
        input_low: f64,
        #[arg(long, default_value = "0.5")]
        input_high: f64,
        #[arg(long)]
        seed: Option<u64>,
        /// Defaults to ./data/benchmark
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Train and evaluate one ESN configuration
    Train {
        #[arg(short, long)]
        dataset: PathBuf,
        /// JSON configuration from a previous run
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        params: HyperParams,
        /// Defaults to ./results/model_evaluations/benchmarks
        #[arg(long)]
        results_dir: Option<PathBuf>,
        #[arg(long)]
        no_save: bool,
        #[arg(long, default_value = "200")]
        plot_points: usize,
    },
    /// Grid search over spectral radius, leaking rate, input scaling and size
    Gridsearch {
        #[arg(short, long)]
        dataset: PathBuf,
        /// Base configuration for the fields that are not swept
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        params: HyperParams,
        #[arg(long)]
        results_dir: Option<PathBuf>,
        #[arg(long, default_value = "20")]
        top: usize,
        #[arg(short, long, default_value = "esn_best.json")]
        best_output: PathBuf,
    },
}

#[derive(Serialize)]
struct RunSummary {
    dataset: String,
    nrmse: f64,
    nrmse_per_output: Vec<f64>,
    train_time_ms: u64,
}

fn load_config(path: Option<&Path>, params: &HyperParams) -> Result<EsnConfig> {
    let mut config = match path {
        Some(p) => {
            let json = std::fs::read_to_string(p).with_context(|| format!("Cannot read {:?}", p))?;
            serde_json::from_str(&json).with_context(|| format!("Invalid JSON in {:?}", p))?
        }
        None => EsnConfig::default(),
    };

    if let Some(v) = params.reservoir_size {
        config.reservoir_size = v;
    }
    if let Some(v) = params.spectral_radius {
        config.spectral_radius = v;
    }
    if let Some(v) = params.leaking_rate {
        config.leaking_rate = v;
    }
    if let Some(v) = params.sparsity {
        config.sparsity = v;
    }
    if let Some(v) = params.input_scaling {
        config.input_scaling = v;
    }
    if let Some(tag) = &params.activation {
        config.activation = Activation::from_tag(tag);
    }
    if let Some(v) = params.ridge_alpha {
        config.ridge_alpha = v;
    }
    if let Some(v) = params.fit_intercept {
        config.fit_intercept = v;
    }
    if let Some(v) = params.washout {
        config.washout = v;
    }
    if let Some(v) = params.spectral_method {
        config.spectral_method = v;
    }
    if let Some(v) = params.seed {
        config.seed = v;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            order,
            num_samples,
            input_low,
            input_high,
            seed,
            output_dir,
        } => {
            let dir = output_dir.unwrap_or_else(store::data_dir);
            let series = narma::generate(&NarmaParams {
                order,
                num_samples,
                input_range: (input_low, input_high),
                seed,
            })?;
            let path = store::write_dataset(&dir, &series.dataset)?;
            println!("Dataset saved: {}", path.display());

            if series.generated_seed {
                let log = store::append_seed_log(&dir, &series.dataset.name, series.seed)?;
                println!(
                    "Random seed {} was generated and logged in {}",
                    series.seed,
                    log.display()
                );
            } else {
                println!("Used provided seed: {}", series.seed);
            }
        }
        Command::Train {
            dataset,
            config,
            params,
            results_dir,
            no_save,
            plot_points,
        } => {
            let data = store::read_dataset(&dataset)?;
            let config = load_config(config.as_deref(), &params)?;
            display::display_config(&config);

            let start = Instant::now();
            let (_, evaluation) = training::train_and_evaluate(&config, &data)
                .with_context(|| format!("Training failed on {}", data.name))?;
            let train_time_ms = start.elapsed().as_millis() as u64;

            display::display_evaluation(&evaluation, train_time_ms);
            display::display_prediction_chart(&evaluation.y_true, &evaluation.y_pred, plot_points);

            if !no_save {
                let base = results_dir.unwrap_or_else(store::results_dir);
                let dir = store::create_experiment_dir(&base, &data.name)?;
                store::save_json(&dir, "params.json", &config)?;
                store::save_json(
                    &dir,
                    "results.json",
                    &RunSummary {
                        dataset: data.name.clone(),
                        nrmse: evaluation.nrmse,
                        nrmse_per_output: evaluation.nrmse_per_output.clone(),
                        train_time_ms,
                    },
                )?;
                store::save_predictions(&dir, &evaluation.y_true, &evaluation.y_pred)?;
                println!("\nExperiment saved in {}", dir.display());
            }
        }
        Command::Gridsearch {
            dataset,
            config,
            params,
            results_dir,
            top,
            best_output,
        } => {
            let data = store::read_dataset(&dataset)?;
            let base = load_config(config.as_deref(), &params)?;
            let configs = gridsearch::generate_grid(&base, &GridAxes::default());
            println!("{} configurations to evaluate on {}", configs.len(), data.name);

            let results = gridsearch::run_grid_search(&data, &configs)?;

            let log_base = results_dir.unwrap_or_else(store::results_dir);
            let mut log = store::ExperimentLog::create(&log_base, &data.name)?;
            for trial in &results.results {
                log.line(&gridsearch::describe(trial))?;
            }
            let log_path = log.finish(&results.best_config, results.best_nrmse)?;

            display::display_grid_search_top(&results, top);

            let best_json = serde_json::to_string_pretty(&results.best_config)?;
            std::fs::write(&best_output, best_json)
                .with_context(|| format!("Cannot write {:?}", best_output))?;

            println!("\nExperiment log saved: {}", log_path.display());
            println!("Best NRMSE: {}", results.best_nrmse);
            println!("Best configuration saved in {}", best_output.display());
        }
    }

    Ok(())
}
