//! Reporting utilities: residuals, fit quality and plain-text summaries.

pub mod format;

pub use format::*;

use crate::domain::{FitQuality, PolarizationParameters, PolarizationTrace};
use crate::models::signal_at;

/// Observed minus fitted signal for each trace point.
pub fn polarization_residuals(
    trace: &PolarizationTrace,
    params: &PolarizationParameters,
    thermal_energy: f64,
) -> Vec<f64> {
    trace
        .detuning()
        .iter()
        .zip(trace.signal())
        .map(|(&x, &y)| y - signal_at(x, params, thermal_energy))
        .collect()
}

/// Summary statistics of a residual vector. An empty vector gives zeros.
pub fn fit_quality(residuals: &[f64]) -> FitQuality {
    let n = residuals.len();
    let sse: f64 = residuals.iter().map(|r| r * r).sum();
    let rmse = if n > 0 { (sse / n as f64).sqrt() } else { 0.0 };
    let max_abs_residual = residuals.iter().fold(0.0f64, |m, r| m.max(r.abs()));
    FitQuality {
        sse,
        rmse,
        max_abs_residual,
        n,
    }
}
