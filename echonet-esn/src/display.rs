use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use textplots::{Chart, Plot, Shape};

use crate::config::{EsnConfig, GridSearchResults};
use crate::training::Evaluation;

fn activation_label(config: &EsnConfig) -> String {
    format!("{:?}", config.activation).to_lowercase()
}

pub fn display_config(config: &EsnConfig) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Parameter", "Value"]);

    let rows = [
        ("input_size", config.input_size.to_string()),
        ("reservoir_size", config.reservoir_size.to_string()),
        ("output_size", config.output_size.to_string()),
        ("spectral_radius", config.spectral_radius.to_string()),
        ("leaking_rate", config.leaking_rate.to_string()),
        ("sparsity (kept)", config.sparsity.to_string()),
        ("input_scaling", config.input_scaling.to_string()),
        ("activation", activation_label(config)),
        ("ridge_alpha", format!("{:e}", config.ridge_alpha)),
        ("fit_intercept", config.fit_intercept.to_string()),
        ("washout", config.washout.to_string()),
        ("seed", config.seed.to_string()),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }

    println!("{table}");
}

pub fn display_evaluation(evaluation: &Evaluation, train_time_ms: u64) {
    println!("\n== ESN evaluation ==\n");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"]);

    table.add_row(vec![
        Cell::new("NRMSE"),
        Cell::new(format!("{:.6}", evaluation.nrmse)).fg(Color::Green),
    ]);
    if evaluation.nrmse_per_output.len() > 1 {
        for (k, v) in evaluation.nrmse_per_output.iter().enumerate() {
            table.add_row(vec![Cell::new(format!("NRMSE[{k}]")), Cell::new(format!("{v:.6}"))]);
        }
    }
    table.add_row(vec![
        Cell::new("Samples scored"),
        Cell::new(evaluation.y_true.len().to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Training time"),
        Cell::new(format!("{train_time_ms} ms")),
    ]);

    println!("{table}");
}

/// ASCII plot of true vs predicted (first `max_points` steps).
pub fn display_prediction_chart(y_true: &[f64], y_pred: &[f64], max_points: usize) {
    let n = y_true.len().min(y_pred.len()).min(max_points);
    if n < 2 {
        println!("  (not enough points to plot)");
        return;
    }

    let to_points = |ys: &[f64]| -> Vec<(f32, f32)> {
        ys.iter()
            .take(n)
            .enumerate()
            .filter(|(_, y)| y.is_finite())
            .map(|(t, &y)| (t as f32, y as f32))
            .collect()
    };
    let truth = to_points(y_true);
    let predicted = to_points(y_pred);
    let truth_shape = Shape::Lines(&truth);
    let predicted_shape = Shape::Lines(&predicted);

    println!("\n== Predictions vs actual (first {n} steps) ==\n");
    Chart::new(120, 40, 0.0, (n - 1) as f32)
        .lineplot(&truth_shape)
        .lineplot(&predicted_shape)
        .display();
}

pub fn display_grid_search_top(results: &GridSearchResults, top_n: usize) {
    println!(
        "\n== Top {} configurations (of {}) ==\n",
        top_n.min(results.results.len()),
        results.results.len()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "N_res", "rho", "alpha", "in_sc", "NRMSE", "ms"]);

    for (i, r) in results.results.iter().take(top_n).enumerate() {
        let row = vec![
            format!("{}", i + 1),
            format!("{}", r.config.reservoir_size),
            format!("{:.2}", r.config.spectral_radius),
            format!("{:.1}", r.config.leaking_rate),
            format!("{:.2}", r.config.input_scaling),
            format!("{:.6}", r.nrmse),
            format!("{}", r.train_time_ms),
        ];

        if i == 0 {
            table.add_row(row.iter().map(|s| Cell::new(s).fg(Color::Green)).collect::<Vec<_>>());
        } else {
            table.add_row(row);
        }
    }

    println!("{table}");
}
