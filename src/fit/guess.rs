//! Heuristic starting point for the polarization-line fit.
//!
//! The recipe:
//!
//! 1. regress the last tenth of the trace to estimate the background slope
//! 2. remove that slope and Gaussian-differentiate what is left
//! 3. the steepest point is the transition; the 10–90 % range of the flattened
//!    signal is the step height
//!
//! The sign of the step height is `sign(y[0] - y[n-1]) * sign(der[idx])`. For a
//! clean monotone step the two factors disagree, so the guessed sensitivity
//! comes out negative; the optimizer flips it.

use tracing::warn;

use crate::domain::{PolarizationFitConfig, PolarizationParameters, PolarizationTrace};
use crate::error::AppError;
use crate::math::{argmax_abs, fit_line, gaussian_filter1d, percentile, sign};

/// Shortest trace the tail regression and derivative can work with.
pub const MIN_TRACE_LEN: usize = 10;

/// Guess with the default calibration constants.
pub fn guess(trace: &PolarizationTrace) -> Result<PolarizationParameters, AppError> {
    guess_with(trace, &PolarizationFitConfig::default())
}

/// Guess using the tail fraction, derivative scale and tunnel coupling seed
/// from `config`.
pub fn guess_with(
    trace: &PolarizationTrace,
    config: &PolarizationFitConfig,
) -> Result<PolarizationParameters, AppError> {
    let n = trace.len();
    if n < MIN_TRACE_LEN {
        return Err(AppError::shape_mismatch(format!(
            "Trace has {n} points; at least {MIN_TRACE_LEN} are required."
        )));
    }
    let x = trace.detuning();
    let y = trace.signal();

    let numpts = ((n as f64 * config.tail_fraction).round_ties_even() as usize).clamp(2, n);
    let slope = match fit_line(&x[n - numpts..], &y[n - numpts..]) {
        Some((slope, _)) if slope.is_finite() => slope,
        _ => {
            warn!(numpts, "tail regression is ill-conditioned; assuming a flat background");
            0.0
        }
    };

    let flattened: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| yi - slope * (xi - x[0]))
        .collect();
    let derivative = gaussian_filter1d(&flattened, config.derivative_sigma, 1);
    let idx = argmax_abs(&derivative).unwrap_or(0);

    let span = percentile(&flattened, 90.0) - percentile(&flattened, 10.0);
    let sensitivity = sign(y[0] - y[n - 1]) * sign(derivative[idx]) * span;

    Ok(PolarizationParameters {
        tunnel_coupling: config.tunnel_coupling_guess,
        detuning_offset: x[idx],
        sensor_offset: y[idx] - sensitivity / 2.0,
        slope_left: slope,
        slope_right: slope,
        sensitivity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::evaluate;

    fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn guess_locates_the_step() {
        let x = linspace(-10.0, 10.0, 201);
        let truth = PolarizationParameters {
            tunnel_coupling: 0.3,
            detuning_offset: 0.0,
            sensor_offset: 0.0,
            slope_left: 0.01,
            slope_right: 0.01,
            sensitivity: 2.0,
        };
        let y = evaluate(&x, &truth, 0.001);
        let trace = PolarizationTrace::new(x, y).unwrap();
        let g = guess(&trace).unwrap();

        assert!((g.tunnel_coupling - 0.0525).abs() < 1e-12);
        assert!(g.detuning_offset.abs() < 0.15);
        assert!((g.slope_left - 0.0105).abs() < 1e-3);
        assert_eq!(g.slope_left, g.slope_right);
        // Sign convention makes the seed negative for a rising step.
        assert!((g.sensitivity + 1.99).abs() < 0.05);
        assert!((g.sensor_offset - 1.99).abs() < 0.05);
    }

    #[test]
    fn constant_trace_has_zero_sensitivity() {
        let x = linspace(0.0, 1.0, 50);
        let trace = PolarizationTrace::new(x, vec![3.0; 50]).unwrap();
        let g = guess(&trace).unwrap();
        assert_eq!(g.sensitivity, 0.0);
        assert!(g.slope_left.abs() < 1e-9);
        assert!((g.sensor_offset - 3.0).abs() < 1e-9);
        for v in g.to_array() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn short_trace_is_rejected() {
        let trace = PolarizationTrace::new(linspace(0.0, 1.0, 9), vec![0.0; 9]).unwrap();
        let err = guess(&trace).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn tail_uses_at_least_two_points() {
        // 10 points with a 0.1 tail rounds to 1; the regression still sees 2.
        let x = linspace(0.0, 9.0, 10);
        let y: Vec<f64> = x.iter().map(|v| 0.5 * v).collect();
        let trace = PolarizationTrace::new(x, y).unwrap();
        let g = guess(&trace).unwrap();
        assert!((g.slope_left - 0.5).abs() < 1e-9);
    }
}
