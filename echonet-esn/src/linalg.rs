use faer::prelude::Solve;
use faer::{Mat, Side};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Axis};

use crate::error::{EsnError, Result};

/// Convert ndarray Array2 to faer Mat (column-major).
fn ndarray_to_faer(arr: &Array2<f64>) -> Mat<f64> {
    let (rows, cols) = (arr.nrows(), arr.ncols());
    Mat::from_fn(rows, cols, |i, j| arr[[i, j]])
}

/// Convert faer Mat back to ndarray Array2.
fn faer_to_ndarray(mat: &Mat<f64>) -> Array2<f64> {
    let (rows, cols) = (mat.nrows(), mat.ncols());
    Array2::from_shape_fn((rows, cols), |(i, j)| mat[(i, j)])
}

fn ndarray_to_nalgebra(arr: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

fn nalgebra_to_ndarray(mat: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Cholesky solve of A * X = B. `None` when A is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array2<f64>) -> Option<Array2<f64>> {
    let llt = ndarray_to_faer(a).llt(Side::Lower).ok()?;
    let x = llt.solve(&ndarray_to_faer(b));
    Some(faer_to_ndarray(&x))
}

/// Relative cutoff under which singular values count as zero.
const RCOND: f64 = 1e-12;

/// Iteration cap for the SVD; convergence normally takes a few dozen sweeps.
const SVD_MAX_ITER: usize = 10_000;

fn ensure_finite(what: &str, a: &Array2<f64>) -> Result<()> {
    if a.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(EsnError::Solver(format!("non-finite values in {what}")))
    }
}

/// Minimum-norm least-squares solution of A * X = B via SVD.
pub fn lstsq_min_norm(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    ensure_finite("least-squares matrix", a)?;
    ensure_finite("least-squares right-hand side", b)?;
    let svd = ndarray_to_nalgebra(a)
        .try_svd(true, true, f64::EPSILON, SVD_MAX_ITER)
        .ok_or_else(|| EsnError::Solver(format!("SVD did not converge in {SVD_MAX_ITER} iterations")))?;
    let tol = svd.singular_values.max() * RCOND;
    let x = svd
        .solve(&ndarray_to_nalgebra(b), tol)
        .map_err(|e| EsnError::Solver(e.to_string()))?;
    Ok(nalgebra_to_ndarray(&x))
}

/// Ridge regression without intercept: minimizes ||X W^T - Y||² + alpha ||W||².
///
/// - x: [T, state_dim], one recorded state per row
/// - y: [T, output_dim]
/// - Returns W: [output_dim, state_dim]
///
/// With `alpha == 0` this is plain least squares and is solved by SVD, which
/// yields the minimum-norm solution when X is rank deficient. Otherwise the
/// smaller of the primal (d×d) and dual (T×T) normal equations is solved by
/// Cholesky, falling back to SVD if the factorization fails.
pub fn ridge_regression(x: &Array2<f64>, y: &Array2<f64>, alpha: f64) -> Result<Array2<f64>> {
    let t = x.nrows();
    let d = x.ncols();

    if y.nrows() != t {
        return Err(EsnError::shape("ridge targets (rows)", t, y.nrows()));
    }
    if t == 0 {
        return Err(EsnError::EmptySequence { needed: 1, got: 0 });
    }
    // Diverged reservoirs produce inf/NaN states
    ensure_finite("design matrix", x)?;
    ensure_finite("targets", y)?;

    if alpha == 0.0 {
        let w_t = lstsq_min_norm(x, y)?;
        return Ok(w_t.t().to_owned());
    }

    let solve = |a: &Array2<f64>, b: &Array2<f64>| -> Result<Array2<f64>> {
        // Finite but huge states can still overflow the Gram matrix
        ensure_finite("normal equations", a)?;
        ensure_finite("normal equations", b)?;
        match cholesky_solve(a, b) {
            Some(sol) => Ok(sol),
            None => {
                log::warn!("Ridge system not positive definite, using least-norm SVD solve");
                lstsq_min_norm(a, b)
            }
        }
    };

    let w_t = if t < d {
        // Dual: G = X X^T + alpha I  [T×T], Z = G^-1 Y, W^T = X^T Z
        let mut g = x.dot(&x.t());
        for i in 0..t {
            g[[i, i]] += alpha;
        }
        let z = solve(&g, y)?;
        x.t().dot(&z)
    } else {
        // Primal: A = X^T X + alpha I  [d×d], W^T = A^-1 X^T Y
        let mut a = x.t().dot(x);
        for i in 0..d {
            a[[i, i]] += alpha;
        }
        let b = x.t().dot(y);
        solve(&a, &b)?
    };

    Ok(w_t.t().to_owned())
}

/// Subtract each column's mean. Returns the centred matrix and the means.
pub fn center_columns(a: &Array2<f64>) -> (Array2<f64>, Array1<f64>) {
    let rows = a.nrows().max(1) as f64;
    let means = a.sum_axis(Axis(0)) / rows;
    (a - &means, means)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ridge_regression_identity() {
        let x = Array2::eye(3);
        let y = array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]];
        let w = ridge_regression(&x, &y, 1e-8).unwrap();
        assert_eq!(w.shape(), &[2, 3]);
        for i in 0..2 {
            for j in 0..3 {
                assert!(
                    (w[[i, j]] - y[[j, i]]).abs() < 1e-6,
                    "w[{i},{j}]={}, expected {}",
                    w[[i, j]],
                    y[[j, i]]
                );
            }
        }
    }

    #[test]
    fn test_ridge_regression_small() {
        // Rows: [1,1] -> 5, [2,0] -> 2  =>  w = [1, 4]
        let x = array![[1.0, 1.0], [2.0, 0.0]];
        let y = array![[5.0], [2.0]];
        for alpha in [0.0, 1e-10] {
            let w = ridge_regression(&x, &y, alpha).unwrap();
            assert_eq!(w.shape(), &[1, 2]);
            assert!((w[[0, 0]] - 1.0).abs() < 1e-6, "alpha={alpha}: w={w}");
            assert!((w[[0, 1]] - 4.0).abs() < 1e-6, "alpha={alpha}: w={w}");
        }
    }

    #[test]
    fn test_rank_deficient_min_norm() {
        // Duplicate columns: any w with w0 + w1 = 2 fits, least norm is [1, 1]
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![[2.0], [4.0], [6.0]];
        let w = ridge_regression(&x, &y, 0.0).unwrap();
        assert!(w.iter().all(|v| v.is_finite()));
        assert!((w[[0, 0]] - 1.0).abs() < 1e-9, "w={w}");
        assert!((w[[0, 1]] - 1.0).abs() < 1e-9, "w={w}");
    }

    #[test]
    fn test_ridge_shrinks_weights() {
        let x = Array2::from_shape_fn((20, 3), |(i, j)| ((i * 3 + j) as f64 * 0.37).sin());
        let y = Array2::from_shape_fn((20, 1), |(i, _)| (i as f64 * 0.2).cos());
        let loose = ridge_regression(&x, &y, 1e-8).unwrap();
        let tight = ridge_regression(&x, &y, 100.0).unwrap();
        let norm = |w: &Array2<f64>| w.iter().map(|v| v * v).sum::<f64>();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_ridge_regression_dual_path() {
        // T < d triggers the dual formulation
        let x = Array2::from_shape_fn((3, 10), |(i, j)| (j * 3 + i + 1) as f64 * 0.1);
        let y = Array2::from_shape_fn((3, 2), |(i, j)| (j * 3 + i + 1) as f64);

        let w = ridge_regression(&x, &y, 0.01).unwrap();
        assert_eq!(w.shape(), &[2, 10]);

        let y_hat = x.dot(&w.t());
        for i in 0..3 {
            for j in 0..2 {
                assert!(
                    (y_hat[[i, j]] - y[[i, j]]).abs() < 0.5,
                    "y_hat[{i},{j}]={}, expected ~{}",
                    y_hat[[i, j]],
                    y[[i, j]]
                );
            }
        }
    }

    #[test]
    fn test_primal_dual_agree() {
        // Same problem solved both ways must give the same weights
        let x = Array2::from_shape_fn((6, 4), |(i, j)| ((i + 2 * j) as f64 * 0.7).sin());
        let y = Array2::from_shape_fn((6, 1), |(i, _)| i as f64 * 0.3);
        let alpha = 0.1;

        let w_primal = ridge_regression(&x, &y, alpha).unwrap();

        // Dual closed form computed by hand on the same data
        let mut g = x.dot(&x.t());
        for i in 0..6 {
            g[[i, i]] += alpha;
        }
        let z = lstsq_min_norm(&g, &y).unwrap();
        let w_dual = x.t().dot(&z).t().to_owned();

        for j in 0..4 {
            assert!(
                (w_primal[[0, j]] - w_dual[[0, j]]).abs() < 1e-9,
                "primal={}, dual={}",
                w_primal[[0, j]],
                w_dual[[0, j]]
            );
        }
    }

    #[test]
    fn test_non_finite_design_is_solver_error() {
        let mut x = Array2::from_shape_fn((5, 3), |(i, j)| (i + j) as f64);
        x.row_mut(2).fill(f64::INFINITY);
        let y = Array2::ones((5, 1));
        assert!(matches!(lstsq_min_norm(&x, &y), Err(EsnError::Solver(_))));
        for alpha in [0.0, 1e-6] {
            assert!(matches!(ridge_regression(&x, &y, alpha), Err(EsnError::Solver(_))));
        }

        let mut x_nan = Array2::from_shape_fn((8, 3), |(i, j)| ((i * j) as f64).sin());
        x_nan[[4, 1]] = f64::NAN;
        assert!(matches!(ridge_regression(&x_nan, &Array2::ones((8, 1)), 1e-6), Err(EsnError::Solver(_))));
    }

    #[test]
    fn test_overflowing_gram_is_solver_error() {
        let x = Array2::from_elem((4, 2), 1e300);
        let y = Array2::ones((4, 1));
        assert!(matches!(ridge_regression(&x, &y, 1e-6), Err(EsnError::Solver(_))));
    }

    #[test]
    fn test_center_columns() {
        let a = array![[1.0, 10.0], [3.0, 20.0], [5.0, 60.0]];
        let (centred, means) = center_columns(&a);
        assert_eq!(means, array![3.0, 30.0]);
        assert_eq!(centred, array![[-2.0, -20.0], [0.0, -10.0], [2.0, 30.0]]);
    }

    #[test]
    fn test_shape_mismatch() {
        let x = Array2::zeros((4, 2));
        let y = Array2::zeros((3, 1));
        assert!(matches!(
            ridge_regression(&x, &y, 1e-6),
            Err(EsnError::Shape { .. })
        ));
    }
}
