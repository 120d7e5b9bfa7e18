//! Spectral radius measurement.
//!
//! This is the only numerically delicate step of reservoir construction, so
//! it sits behind [`SpectralRadius`]: the exact Schur backend is the default
//! and power iteration can replace it for reservoirs too large for an
//! O(n³) decomposition.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::config::SpectralMethod;

pub trait SpectralRadius {
    /// Largest eigenvalue modulus of the square matrix `w`.
    fn spectral_radius(&self, w: &Array2<f64>) -> f64;
}

/// Exact radius from the full (complex) spectrum of a general real matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchurEigenvalues;

impl SpectralRadius for SchurEigenvalues {
    fn spectral_radius(&self, w: &Array2<f64>) -> f64 {
        let n = w.nrows();
        if n == 0 {
            return 0.0;
        }
        let m = DMatrix::from_fn(n, w.ncols(), |i, j| w[[i, j]]);
        m.complex_eigenvalues()
            .iter()
            .map(|z| z.norm())
            .fold(0.0, f64::max)
    }
}

/// Norm-growth estimate: rho ~ exp(mean(ln ||W v_k||)) over normalized
/// iterates. Averaging the log growth (instead of taking the last ratio)
/// keeps it stable when the dominant eigenvalues are a complex pair.
#[derive(Debug, Clone, Copy)]
pub struct PowerIteration {
    pub max_iter: usize,
    pub burn_in: usize,
    pub seed: u64,
}

impl Default for PowerIteration {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            burn_in: 200,
            seed: 0,
        }
    }
}

fn l2(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

impl SpectralRadius for PowerIteration {
    fn spectral_radius(&self, w: &Array2<f64>) -> f64 {
        let n = w.nrows();
        if n == 0 {
            return 0.0;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut v: Array1<f64> = Array1::from_shape_fn(n, |_| rng.random::<f64>() * 2.0 - 1.0);
        let norm = l2(&v);
        if norm < 1e-15 {
            return 0.0;
        }
        v /= norm;

        let burn_in = self.burn_in.min(self.max_iter.saturating_sub(1));
        let mut log_sum = 0.0;
        let mut count = 0usize;

        for k in 0..self.max_iter {
            let w_v = w.dot(&v);
            let growth = l2(&w_v);
            if growth < 1e-300 {
                // Iterate annihilated: nilpotent on this subspace
                return 0.0;
            }
            v = w_v / growth;
            if k >= burn_in {
                log_sum += growth.ln();
                count += 1;
            }
        }

        if count == 0 {
            return 0.0;
        }
        (log_sum / count as f64).exp()
    }
}

impl SpectralMethod {
    pub fn estimator(self, seed: u64) -> Box<dyn SpectralRadius + Send + Sync> {
        match self {
            SpectralMethod::Eigen => Box::new(SchurEigenvalues),
            SpectralMethod::Power => Box::new(PowerIteration {
                seed,
                ..Default::default()
            }),
        }
    }
}
