use serde::{Deserialize, Serialize};

use crate::error::{EsnError, Result};

/// Elementwise nonlinearity applied to the reservoir pre-activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Tanh,
    Relu,
    /// No squashing. Unrecognized activation tags resolve here.
    Identity,
}

impl Activation {
    /// Resolve a free-form tag. Anything other than `tanh`/`relu` is passed
    /// through activation-free.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "tanh" => Activation::Tanh,
            "relu" => Activation::Relu,
            other => {
                log::warn!("Unknown activation '{other}', reservoir will run without activation");
                Activation::Identity
            }
        }
    }

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Relu => x.max(0.0),
            Activation::Identity => x,
        }
    }
}

/// Numerical backend used to measure the reservoir spectral radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SpectralMethod {
    /// All eigenvalues via real Schur decomposition.
    #[default]
    Eigen,
    /// Power-iteration estimate, for large reservoirs.
    Power,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsnConfig {
    pub input_size: usize,
    pub reservoir_size: usize,
    pub output_size: usize,
    pub spectral_radius: f64,
    pub leaking_rate: f64,
    /// Mask threshold: an entry of W survives when its uniform [0, 1) mask
    /// draw is <= `sparsity`, so this is the expected fraction of entries
    /// KEPT (a density), not the fraction zeroed.
    pub sparsity: f64,
    pub input_scaling: f64,
    pub activation: Activation,
    pub ridge_alpha: f64,
    /// Fit the readout on column-centred states and targets, then install
    /// only the coefficients. Predictions stay `X * Wout^T`, so the fitted
    /// intercept is dropped.
    pub fit_intercept: bool,
    /// Recorded states dropped before the readout fit.
    pub washout: usize,
    pub spectral_method: SpectralMethod,
    pub seed: u64,
}

impl Default for EsnConfig {
    fn default() -> Self {
        Self {
            input_size: 1,
            reservoir_size: 100,
            output_size: 1,
            spectral_radius: 0.95,
            leaking_rate: 1.0,
            sparsity: 0.1,
            input_scaling: 0.1,
            activation: Activation::Tanh,
            ridge_alpha: 1e-6,
            fit_intercept: true,
            washout: 0,
            spectral_method: SpectralMethod::Eigen,
            seed: 42,
        }
    }
}

impl EsnConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EsnError::InvalidConfig(msg));

        if self.input_size == 0 {
            return invalid("input_size must be > 0".into());
        }
        if self.reservoir_size == 0 {
            return invalid("reservoir_size must be > 0".into());
        }
        if self.output_size == 0 {
            return invalid("output_size must be > 0".into());
        }
        if !(self.spectral_radius.is_finite() && self.spectral_radius > 0.0) {
            return invalid(format!(
                "spectral_radius must be finite and > 0, got {}",
                self.spectral_radius
            ));
        }
        if !(0.0..=1.0).contains(&self.leaking_rate) {
            return invalid(format!("leaking_rate must be in [0, 1], got {}", self.leaking_rate));
        }
        if !(0.0..=1.0).contains(&self.sparsity) {
            return invalid(format!("sparsity must be in [0, 1], got {}", self.sparsity));
        }
        if !self.input_scaling.is_finite() {
            return invalid(format!("input_scaling must be finite, got {}", self.input_scaling));
        }
        if !(self.ridge_alpha.is_finite() && self.ridge_alpha >= 0.0) {
            return invalid(format!("ridge_alpha must be >= 0, got {}", self.ridge_alpha));
        }
        Ok(())
    }
}

/// Outcome of one trained and scored configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub config: EsnConfig,
    pub nrmse: f64,
    pub train_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResults {
    /// Sorted by ascending NRMSE.
    pub results: Vec<TrialResult>,
    pub best_config: EsnConfig,
    pub best_nrmse: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EsnConfig::default();
        assert_eq!(config.reservoir_size, 100);
        assert!((config.spectral_radius - 0.95).abs() < 1e-10);
        assert_eq!(config.activation, Activation::Tanh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EsnConfig {
            activation: Activation::Relu,
            spectral_method: SpectralMethod::Power,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"activation\":\"relu\""));
        let restored: EsnConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EsnConfig = serde_json::from_str(r#"{"reservoir_size": 50}"#).unwrap();
        assert_eq!(config.reservoir_size, 50);
        assert_eq!(config.seed, 42);
        assert!(config.fit_intercept);
    }

    #[test]
    fn test_activation_from_tag() {
        assert_eq!(Activation::from_tag("tanh"), Activation::Tanh);
        assert_eq!(Activation::from_tag("relu"), Activation::Relu);
        assert_eq!(Activation::from_tag("sigmoid"), Activation::Identity);
    }

    #[test]
    fn test_activation_apply() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Relu.apply(1.5), 1.5);
        assert_eq!(Activation::Identity.apply(-3.0), -3.0);
        assert!((Activation::Tanh.apply(0.5) - 0.5f64.tanh()).abs() < 1e-15);
    }

    #[test]
    fn test_validate_rejects_out_of_domain() {
        let bad = [
            EsnConfig { reservoir_size: 0, ..Default::default() },
            EsnConfig { input_size: 0, ..Default::default() },
            EsnConfig { leaking_rate: 1.5, ..Default::default() },
            EsnConfig { sparsity: -0.1, ..Default::default() },
            EsnConfig { spectral_radius: 0.0, ..Default::default() },
            EsnConfig { spectral_radius: f64::NAN, ..Default::default() },
            EsnConfig { ridge_alpha: -1.0, ..Default::default() },
        ];
        for config in &bad {
            assert!(
                matches!(config.validate(), Err(EsnError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
    }
}
