use ndarray::{Array1, Array2};

use echonet_data::narma::{generate, NarmaParams};
use echonet_data::store;
use echonet_esn::config::EsnConfig;
use echonet_esn::error::EsnError;
use echonet_esn::metrics;
use echonet_esn::reservoir::Reservoir;
use echonet_esn::training::{evaluate, train_and_evaluate};

fn small_config() -> EsnConfig {
    EsnConfig {
        input_size: 1,
        reservoir_size: 50,
        output_size: 1,
        spectral_radius: 0.9,
        leaking_rate: 0.3,
        sparsity: 0.1,
        input_scaling: 0.1,
        seed: 42,
        ..Default::default()
    }
}

#[test]
fn test_hundred_step_run() {
    let inputs = Array2::from_shape_fn((100, 1), |(t, _)| 0.25 + 0.25 * (t as f64 * 0.37).sin());
    let targets = Array2::from_shape_fn((100, 1), |(t, _)| 0.1 + 0.05 * (t as f64 * 0.21).cos());

    let mut reservoir = Reservoir::from_seed(&small_config()).unwrap();
    let eval = evaluate(&mut reservoir, inputs.view(), targets.view(), 1e-6).unwrap();

    assert!(eval.nrmse.is_finite());
    assert!(eval.nrmse >= 0.0);
    assert_eq!(reservoir.w_out().shape(), &[1, 50]);
    assert_eq!(eval.y_true.len(), 99);
}

#[test]
fn test_same_seed_same_score() {
    let series = generate(&NarmaParams {
        num_samples: 300,
        seed: Some(11),
        ..Default::default()
    })
    .unwrap();

    let (a, eval_a) = train_and_evaluate(&small_config(), &series.dataset).unwrap();
    let (b, eval_b) = train_and_evaluate(&small_config(), &series.dataset).unwrap();
    assert_eq!(a.w_out(), b.w_out());
    assert_eq!(eval_a.nrmse, eval_b.nrmse);
}

#[test]
fn test_empty_reservoir_is_rejected() {
    let config = EsnConfig {
        sparsity: 0.0,
        ..small_config()
    };
    assert!(matches!(
        Reservoir::from_seed(&config),
        Err(EsnError::DegenerateReservoir { .. })
    ));
}

#[test]
fn test_narma_csv_to_score() {
    let dir = std::env::temp_dir().join(format!("echonet_e2e_{}", std::process::id()));
    let series = generate(&NarmaParams {
        num_samples: 400,
        seed: Some(3),
        ..Default::default()
    })
    .unwrap();

    let path = store::write_dataset(&dir, &series.dataset).unwrap();
    let loaded = store::read_dataset(&path).unwrap();
    assert_eq!(loaded.name, series.dataset.name);
    assert_eq!(loaded.len(), 400);

    let config = EsnConfig {
        reservoir_size: 100,
        washout: 50,
        fit_intercept: false,
        ..small_config()
    };
    let (_, eval) = train_and_evaluate(&config, &loaded).unwrap();
    assert!(eval.nrmse.is_finite());
    // Uncentred ridge optimum can never be worse than the all-zero readout
    let zeros = Array1::zeros(eval.y_true.len());
    let baseline = metrics::nrmse(Array1::from(eval.y_true.clone()).view(), zeros.view()).unwrap();
    assert!(eval.nrmse < baseline, "nrmse={} baseline={}", eval.nrmse, baseline);

    let saved = store::save_predictions(&dir, &eval.y_true, &eval.y_pred).unwrap();
    assert!(saved.exists());

    std::fs::remove_dir_all(&dir).ok();
}
