//! Straight-line regression.
//!
//! The polarization guesser regresses a line through the tail of a trace:
//!
//! ```text
//! minimize Σ (y_i - (a + b x_i))^2
//! ```
//!
//! `x` is centered before the design matrix is built, so large detuning
//! offsets do not make the two columns nearly collinear. The tall system is
//! solved through an SVD (`QR::solve` only accepts square matrices).

use nalgebra::{DMatrix, DVector};

/// Singular values below this are treated as zero.
const RANK_EPS: f64 = 1e-10;

/// Degree-1 polynomial fit `y ≈ slope * x + intercept`.
///
/// Returns `(slope, intercept)`, or `None` with fewer than two points, a
/// constant `x`, or a non-finite solution.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    let x_mean = x.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|v| (v - x_mean) * (v - x_mean)).sum();
    if !sxx.is_finite() || sxx <= 0.0 {
        return None;
    }

    let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { x[i] - x_mean } else { 1.0 });
    let rhs = DVector::from_column_slice(y);
    let beta = design.svd(true, true).solve(&rhs, RANK_EPS).ok()?;
    if !beta.iter().all(|v| v.is_finite()) {
        return None;
    }

    let slope = beta[0];
    Some((slope, beta[1] - slope * x_mean))
}
