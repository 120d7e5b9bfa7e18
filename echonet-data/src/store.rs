use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::{Dataset, Sample};

const SEED_LOG: &str = "seed_log.txt";

pub fn data_dir() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("benchmark");
    path
}

pub fn results_dir() -> PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("results");
    path.push("model_evaluations");
    path.push("benchmarks");
    path
}

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Cannot create directory {:?}", dir))
}

/// Read an `Input,Output` CSV. The dataset is named after the file stem.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot open dataset {:?}", path))?;

    let samples = reader
        .deserialize::<Sample>()
        .enumerate()
        .map(|(i, rec)| rec.with_context(|| format!("Bad record at line {} of {:?}", i + 2, path)))
        .collect::<Result<Vec<_>>>()?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let dataset = Dataset::new(name, samples);
    dataset.validate()?;
    log::info!("Loaded {} samples from {:?}", dataset.len(), path);
    Ok(dataset)
}

/// Write `dataset` as `<dir>/<name>.csv` and return the path.
pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.csv", dataset.name));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Cannot create {:?}", path))?;
    for sample in &dataset.samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(path)
}

pub fn append_seed_log(dir: &Path, dataset_name: &str, seed: u64) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(SEED_LOG);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Cannot open {:?}", path))?;
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "{now} - {dataset_name} used seed: {seed}")?;
    Ok(path)
}

/// Create `base/<dataset>/experiment_<timestamp>/`.
pub fn create_experiment_dir(base: &Path, dataset_name: &str) -> Result<PathBuf> {
    let dir = base
        .join(dataset_name)
        .join(format!("experiment_{}", timestamp()));
    ensure_dir(&dir)?;
    Ok(dir)
}

pub fn save_json<T: Serialize>(dir: &Path, file_name: &str, value: &T) -> Result<PathBuf> {
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json).with_context(|| format!("Cannot write {:?}", path))?;
    Ok(path)
}

#[derive(Serialize)]
struct PredictionRow {
    step: usize,
    #[serde(rename = "true")]
    truth: f64,
    predicted: f64,
}

/// Write the true/predicted comparison as `predictions.csv` in `dir`.
pub fn save_predictions(dir: &Path, y_true: &[f64], y_pred: &[f64]) -> Result<PathBuf> {
    let path = dir.join("predictions.csv");
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Cannot create {:?}", path))?;
    for (step, (&truth, &predicted)) in y_true.iter().zip(y_pred.iter()).enumerate() {
        writer.serialize(PredictionRow {
            step,
            truth,
            predicted,
        })?;
    }
    writer.flush()?;
    Ok(path)
}

/// Plain-text log of one grid-search run.
pub struct ExperimentLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ExperimentLog {
    /// Open `base/<dataset>/experiment_<timestamp>.txt` and write the header.
    pub fn create(base: &Path, dataset_name: &str) -> Result<Self> {
        let dir = base.join(dataset_name);
        ensure_dir(&dir)?;
        let ts = timestamp();
        let path = dir.join(format!("experiment_{ts}.txt"));
        let file = File::create(&path).with_context(|| format!("Cannot create {:?}", path))?;
        let mut log = Self {
            path,
            writer: BufWriter::new(file),
        };
        log.line(&format!("===== Experiment Run ({ts}) on {dataset_name} ====="))?;
        Ok(log)
    }

    pub fn line(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "{message}")?;
        Ok(())
    }

    /// Write the best-parameters footer and flush.
    pub fn finish<T: Serialize>(mut self, best_params: &T, best_nrmse: f64) -> Result<PathBuf> {
        self.line("")?;
        self.line("===== Best Parameters for This Experiment =====")?;
        self.line(&serde_json::to_string_pretty(best_params)?)?;
        self.line(&format!("Best NRMSE: {best_nrmse}"))?;
        self.line(&"=".repeat(50))?;
        self.writer.flush()?;
        Ok(self.path)
    }
}
