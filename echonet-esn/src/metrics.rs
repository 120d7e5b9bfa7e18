use ndarray::ArrayView1;

use crate::error::{EsnError, Result};

fn check_pair(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(EsnError::shape("predicted sequence", y_true.len(), y_pred.len()));
    }
    if y_true.is_empty() {
        return Err(EsnError::EmptySequence { needed: 1, got: 0 });
    }
    Ok(())
}

/// Population variance (ddof = 0).
fn variance(y: ArrayView1<'_, f64>) -> f64 {
    let n = y.len() as f64;
    let mean = y.sum() / n;
    y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Population standard deviation (ddof = 0).
pub fn std_dev(y: ArrayView1<'_, f64>) -> Result<f64> {
    if y.is_empty() {
        return Err(EsnError::EmptySequence { needed: 1, got: 0 });
    }
    Ok(variance(y).sqrt())
}

pub fn mse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let sum: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum / y_true.len() as f64)
}

pub fn rmse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    Ok(mse(y_true, y_pred)?.sqrt())
}

/// NRMSE = sqrt(mean((y - y_hat)²)) / std(y).
///
/// Fails with [`EsnError::ZeroVariance`] for a constant `y_true` instead of
/// returning inf/NaN. Constancy is checked on the values themselves: the
/// computed std of a constant series can be a rounding residue above zero.
pub fn nrmse(y_true: ArrayView1<'_, f64>, y_pred: ArrayView1<'_, f64>) -> Result<f64> {
    check_pair(y_true, y_pred)?;
    let first = y_true[0];
    let std = variance(y_true).sqrt();
    if y_true.iter().all(|&v| v == first) || std == 0.0 || !std.is_finite() {
        return Err(EsnError::ZeroVariance);
    }
    Ok(rmse(y_true, y_pred)? / std)
}
