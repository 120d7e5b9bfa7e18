use ndarray::{s, Array2, ArrayView2};

use echonet_data::models::Dataset;

use crate::config::EsnConfig;
use crate::error::{EsnError, Result};
use crate::linalg::{center_columns, ridge_regression};
use crate::metrics;
use crate::reservoir::Reservoir;

/// Design matrices of one readout fit, after washout.
pub struct ReadoutFit {
    /// [T - 1 - washout, reservoir_size]; row t is the state after input t.
    pub states: Array2<f64>,
    /// [T - 1 - washout, output_size]; row t is the target at t + 1.
    pub targets: Array2<f64>,
}

impl ReadoutFit {
    pub fn predictions(&self, w_out: &Array2<f64>) -> Array2<f64> {
        self.states.dot(&w_out.t())
    }
}

/// In-sample scores of a fitted readout.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Mean of `nrmse_per_output`.
    pub nrmse: f64,
    pub nrmse_per_output: Vec<f64>,
    /// First output column, for logging and plotting.
    pub y_true: Vec<f64>,
    pub y_pred: Vec<f64>,
}

/// Feed inputs 0..T-1 through the reservoir, recording the state after each
/// step. The last input is not consumed: its successor target does not exist.
pub fn harvest_states(reservoir: &mut Reservoir, inputs: ArrayView2<'_, f64>) -> Array2<f64> {
    let rows = inputs.nrows().saturating_sub(1);
    let mut states = Array2::zeros((rows, reservoir.config().reservoir_size));
    for t in 0..rows {
        reservoir.update(inputs.row(t));
        states.row_mut(t).assign(reservoir.state());
    }
    states
}

fn check_sequences(
    config: &EsnConfig,
    inputs: ArrayView2<'_, f64>,
    targets: ArrayView2<'_, f64>,
) -> Result<()> {
    if inputs.ncols() != config.input_size {
        return Err(EsnError::shape("input columns", config.input_size, inputs.ncols()));
    }
    if targets.ncols() != config.output_size {
        return Err(EsnError::shape("target columns", config.output_size, targets.ncols()));
    }
    if targets.nrows() != inputs.nrows() {
        return Err(EsnError::shape("target rows", inputs.nrows(), targets.nrows()));
    }
    let needed = config.washout + 2;
    if inputs.nrows() < needed {
        return Err(EsnError::EmptySequence {
            needed,
            got: inputs.nrows(),
        });
    }
    Ok(())
}

/// Drive the reservoir over `inputs`, fit a ridge readout predicting the
/// next-step target, and install it as Wout.
///
/// With `fit_intercept` the solve runs on centred columns and the intercept
/// is discarded. The reservoir state carries over from whatever ran before;
/// repeated calls overwrite Wout.
pub fn train_readout(
    reservoir: &mut Reservoir,
    inputs: ArrayView2<'_, f64>,
    targets: ArrayView2<'_, f64>,
    alpha: f64,
) -> Result<ReadoutFit> {
    check_sequences(reservoir.config(), inputs, targets)?;
    let washout = reservoir.config().washout;
    let fit_intercept = reservoir.config().fit_intercept;

    let all_states = harvest_states(reservoir, inputs);
    let states = all_states.slice(s![washout.., ..]).to_owned();
    let targets = targets.slice(s![1 + washout.., ..]).to_owned();

    let w_out = if fit_intercept {
        let (x, _) = center_columns(&states);
        let (y, _) = center_columns(&targets);
        ridge_regression(&x, &y, alpha)?
    } else {
        ridge_regression(&states, &targets, alpha)?
    };
    reservoir.set_w_out(w_out)?;

    log::debug!(
        "Readout fitted on {} states (washout {washout}, alpha {alpha})",
        states.nrows()
    );

    Ok(ReadoutFit { states, targets })
}

/// Train the readout and score its in-sample predictions.
pub fn evaluate(
    reservoir: &mut Reservoir,
    inputs: ArrayView2<'_, f64>,
    targets: ArrayView2<'_, f64>,
    alpha: f64,
) -> Result<Evaluation> {
    let fit = train_readout(reservoir, inputs, targets, alpha)?;
    let predicted = fit.predictions(reservoir.w_out());

    let nrmse_per_output = (0..fit.targets.ncols())
        .map(|k| metrics::nrmse(fit.targets.column(k), predicted.column(k)))
        .collect::<Result<Vec<_>>>()?;
    let nrmse = nrmse_per_output.iter().sum::<f64>() / nrmse_per_output.len() as f64;

    Ok(Evaluation {
        nrmse,
        nrmse_per_output,
        y_true: fit.targets.column(0).to_vec(),
        y_pred: predicted.column(0).to_vec(),
    })
}

/// Dataset as `[T, 1]` input and target matrices.
pub fn dataset_arrays(dataset: &Dataset) -> (Array2<f64>, Array2<f64>) {
    let t = dataset.len();
    let inputs = Array2::from_shape_fn((t, 1), |(i, _)| dataset.samples[i].input);
    let targets = Array2::from_shape_fn((t, 1), |(i, _)| dataset.samples[i].output);
    (inputs, targets)
}

/// Build a seeded engine for `config` and evaluate it on a scalar dataset.
pub fn train_and_evaluate(config: &EsnConfig, dataset: &Dataset) -> Result<(Reservoir, Evaluation)> {
    let mut reservoir = Reservoir::from_seed(config)?;
    let (inputs, targets) = dataset_arrays(dataset);
    let evaluation = evaluate(&mut reservoir, inputs.view(), targets.view(), config.ridge_alpha)?;
    Ok((reservoir, evaluation))
}
