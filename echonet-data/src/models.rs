use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// One time step of a benchmark series. CSV headers are `Input,Output`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "Input")]
    pub input: f64,
    #[serde(rename = "Output")]
    pub output: f64,
}

/// A named input/output sequence in time order (oldest first).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub samples: Vec<Sample>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn from_series(name: impl Into<String>, inputs: &[f64], outputs: &[f64]) -> Result<Self> {
        if inputs.len() != outputs.len() {
            bail!(
                "Input and output series differ in length: {} vs {}",
                inputs.len(),
                outputs.len()
            );
        }
        let samples = inputs
            .iter()
            .zip(outputs.iter())
            .map(|(&input, &output)| Sample { input, output })
            .collect();
        Ok(Self::new(name, samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn inputs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.input).collect()
    }

    pub fn outputs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.output).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.samples.is_empty() {
            bail!("Dataset '{}' is empty", self.name);
        }
        if let Some(t) = self
            .samples
            .iter()
            .position(|s| !s.input.is_finite() || !s.output.is_finite())
        {
            bail!("Dataset '{}' has a non-finite value at step {t}", self.name);
        }
        Ok(())
    }
}
