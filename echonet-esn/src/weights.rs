use ndarray::Array2;
use rand::{Rng, RngExt};
use sprs::{CsMat, TriMat};

use crate::error::{EsnError, Result};
use crate::spectral::SpectralRadius;

/// Below this the masked matrix has no spectrum worth rescaling.
pub const MIN_SPECTRAL_RADIUS: f64 = 1e-12;

/// Win: `[reservoir_size, input_size]`, Uniform[-1, 1) scaled by `input_scaling`.
pub fn input_weights(
    reservoir_size: usize,
    input_size: usize,
    input_scaling: f64,
    rng: &mut impl Rng,
) -> Array2<f64> {
    let mut w_in = Array2::from_shape_fn((reservoir_size, input_size), |_| {
        rng.random_range(-1.0..1.0)
    });
    w_in *= input_scaling;
    w_in
}

/// W: dense Uniform[-1, 1) entries, masked, then rescaled so its spectral
/// radius equals `spectral_radius`.
///
/// An entry is zeroed when its Uniform[0, 1) mask draw is greater than
/// `sparsity`. The parameter therefore sets the expected fraction of entries
/// kept, and about `1 - sparsity` of W ends up zero.
pub fn reservoir_weights(
    reservoir_size: usize,
    sparsity: f64,
    spectral_radius: f64,
    estimator: &dyn SpectralRadius,
    rng: &mut impl Rng,
) -> Result<Array2<f64>> {
    let n = reservoir_size;
    let mut w = Array2::from_shape_fn((n, n), |_| rng.random_range(-1.0..1.0));
    let mask = Array2::from_shape_fn((n, n), |_| rng.random::<f64>());
    w.zip_mut_with(&mask, |v, &m| {
        if m > sparsity {
            *v = 0.0;
        }
    });

    let degenerate = EsnError::DegenerateReservoir {
        sparsity,
        spectral_radius,
    };

    if w.iter().all(|&v| v == 0.0) {
        return Err(degenerate);
    }

    let rho = estimator.spectral_radius(&w);
    if !rho.is_finite() || rho < MIN_SPECTRAL_RADIUS {
        return Err(degenerate);
    }

    w.mapv_inplace(|v| v * spectral_radius / rho);
    Ok(w)
}

/// Dense to CSR, dropping exact zeros.
pub fn to_csr(w: &Array2<f64>) -> CsMat<f64> {
    let mut tri = TriMat::new((w.nrows(), w.ncols()));
    for ((i, j), &v) in w.indexed_iter() {
        if v != 0.0 {
            tri.add_triplet(i, j, v);
        }
    }
    tri.to_csr()
}

pub fn to_dense(sparse: &CsMat<f64>) -> Array2<f64> {
    let (rows, cols) = sparse.shape();
    let mut dense = Array2::zeros((rows, cols));
    for (row, row_vec) in sparse.outer_iterator().enumerate() {
        for (col, &val) in row_vec.iter() {
            dense[[row, col]] = val;
        }
    }
    dense
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::SchurEigenvalues;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_input_weights_scaled() {
        let mut rng = StdRng::seed_from_u64(42);
        let w_in = input_weights(30, 3, 0.1, &mut rng);
        assert_eq!(w_in.shape(), &[30, 3]);
        assert!(w_in.iter().all(|&v| v.abs() <= 0.1));
        assert!(w_in.iter().any(|&v| v.abs() > 0.05));
    }

    #[test]
    fn test_spectral_radius_matches_target() {
        let mut rng = StdRng::seed_from_u64(42);
        let w = reservoir_weights(60, 0.2, 0.9, &SchurEigenvalues, &mut rng).unwrap();
        let rho = SchurEigenvalues.spectral_radius(&w);
        assert!((rho - 0.9).abs() / 0.9 < 1e-6, "rho={rho}");
    }

    #[test]
    fn test_zero_fraction_is_one_minus_sparsity() {
        // sparsity acts as the kept fraction: ~30% kept, ~70% zeroed
        let mut rng = StdRng::seed_from_u64(7);
        let sparsity = 0.3;
        let w = reservoir_weights(300, sparsity, 0.95, &SchurEigenvalues, &mut rng).unwrap();
        let zero_fraction = w.iter().filter(|&&v| v == 0.0).count() as f64 / w.len() as f64;
        assert!(
            (zero_fraction - (1.0 - sparsity)).abs() < 0.01,
            "zero_fraction={zero_fraction}"
        );
    }

    #[test]
    fn test_zero_sparsity_is_degenerate() {
        let mut rng = StdRng::seed_from_u64(42);
        let err = reservoir_weights(20, 0.0, 0.9, &SchurEigenvalues, &mut rng).unwrap_err();
        assert!(matches!(err, EsnError::DegenerateReservoir { .. }), "{err}");
    }

    #[test]
    fn test_csr_roundtrip_keeps_zeros() {
        let mut rng = StdRng::seed_from_u64(3);
        let w = reservoir_weights(25, 0.4, 0.8, &SchurEigenvalues, &mut rng).unwrap();
        let sparse = to_csr(&w);
        assert_eq!(sparse.nnz(), w.iter().filter(|&&v| v != 0.0).count());
        assert_eq!(to_dense(&sparse), w);
    }
}
