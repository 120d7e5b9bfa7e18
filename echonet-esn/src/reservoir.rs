use ndarray::linalg::general_mat_vec_mul;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, RngExt, SeedableRng};
use sprs::CsMat;

use crate::config::EsnConfig;
use crate::error::{EsnError, Result};
use crate::weights;

/// Echo state network engine: fixed Win and W, mutable state, trainable Wout.
#[derive(Debug, Clone)]
pub struct Reservoir {
    config: EsnConfig,
    w_in: Array2<f64>,
    w_res: CsMat<f64>,
    w_out: Array2<f64>,
    state: Array1<f64>,
    buf: Array1<f64>,
}

impl Reservoir {
    /// Build an engine from `config`, drawing Win, W, mask and the initial
    /// state (in that order) from `rng`.
    pub fn new(config: &EsnConfig, rng: &mut impl Rng) -> Result<Self> {
        config.validate()?;
        let n = config.reservoir_size;

        let w_in = weights::input_weights(n, config.input_size, config.input_scaling, rng);

        let estimator = config.spectral_method.estimator(config.seed);
        let w_dense = weights::reservoir_weights(
            n,
            config.sparsity,
            config.spectral_radius,
            estimator.as_ref(),
            rng,
        )?;
        let w_res = weights::to_csr(&w_dense);

        let state = Array1::from_shape_fn(n, |_| rng.random::<f64>() - 0.5);

        log::debug!(
            "Reservoir built: n={n}, nnz={}, rho={}, seed={}",
            w_res.nnz(),
            config.spectral_radius,
            config.seed
        );

        Ok(Reservoir {
            config: config.clone(),
            w_in,
            w_res,
            w_out: Array2::zeros((config.output_size, n)),
            state,
            buf: Array1::zeros(n),
        })
    }

    /// Build with a private generator seeded from `config.seed`.
    pub fn from_seed(config: &EsnConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        Self::new(config, &mut rng)
    }

    /// One discrete-time step:
    /// x = (1 - a) * x + a * f(Win * u + W * x)
    ///
    /// Panics if `u.len() != input_size`.
    pub fn update(&mut self, u: ArrayView1<'_, f64>) {
        assert_eq!(
            u.len(),
            self.config.input_size,
            "input length must equal input_size"
        );

        // buf = Win * u
        general_mat_vec_mul(1.0, &self.w_in, &u, 0.0, &mut self.buf);

        // buf += W * x
        for (row, row_vec) in self.w_res.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                self.buf[row] += val * self.state[col];
            }
        }

        let a = self.config.leaking_rate;
        let f = self.config.activation;
        self.state.zip_mut_with(&self.buf, |x, &pre| {
            *x = (1.0 - a) * *x + a * f.apply(pre);
        });
    }

    /// Wout * x for the current state.
    pub fn readout(&self) -> Array1<f64> {
        self.w_out.dot(&self.state)
    }

    /// Install a fitted readout. Shape must be `[output_size, reservoir_size]`.
    pub fn set_w_out(&mut self, w_out: Array2<f64>) -> Result<()> {
        let expected = (self.config.output_size, self.config.reservoir_size);
        if w_out.dim() != expected {
            return Err(EsnError::shape(
                "Wout",
                format!("{expected:?}"),
                format!("{:?}", w_out.dim()),
            ));
        }
        self.w_out = w_out;
        Ok(())
    }

    pub fn config(&self) -> &EsnConfig {
        &self.config
    }

    pub fn state(&self) -> &Array1<f64> {
        &self.state
    }

    pub fn w_in(&self) -> &Array2<f64> {
        &self.w_in
    }

    pub fn w_res(&self) -> &CsMat<f64> {
        &self.w_res
    }

    pub fn w_res_dense(&self) -> Array2<f64> {
        weights::to_dense(&self.w_res)
    }

    pub fn w_out(&self) -> &Array2<f64> {
        &self.w_out
    }
}
