//! Polarization-line fit: heuristic guess, then Nelder–Mead on the residual
//! norm.
//!
//! `kT` is held fixed. Each pass may spend `200 * 6` cost evaluations by
//! default; running out of it is reported through
//! [`PolarizationFit::converged`], never as an error.

use tracing::{debug, info, warn};

use crate::domain::{
    PassSummary, PolarizationFit, PolarizationFitConfig, PolarizationParameters, PolarizationTrace,
    SimplexConfig,
};
use crate::error::AppError;
use crate::fit::guess::guess_with;
use crate::fit::simplex::minimize;
use crate::models::signal_at;
use crate::report::{fit_quality, polarization_residuals};

/// Euclidean norm of `model - signal` over the trace.
pub fn residual_norm(params: &PolarizationParameters, trace: &PolarizationTrace, thermal_energy: f64) -> f64 {
    trace
        .detuning()
        .iter()
        .zip(trace.signal())
        .map(|(&x, &y)| {
            let r = signal_at(x, params, thermal_energy) - y;
            r * r
        })
        .sum::<f64>()
        .sqrt()
}

/// Fit with default calibration; returns `(fitted, guess)`.
pub fn fit(
    trace: &PolarizationTrace,
    thermal_energy: f64,
    max_function_evals: Option<usize>,
) -> Result<(PolarizationParameters, PolarizationParameters), AppError> {
    let config = PolarizationFitConfig {
        thermal_energy,
        max_function_evals,
        ..PolarizationFitConfig::default()
    };
    let result = fit_polarization(trace, &config)?;
    Ok((result.fitted, result.guess))
}

fn run_pass(
    trace: &PolarizationTrace,
    thermal_energy: f64,
    start: &[f64],
    simplex: &SimplexConfig,
    label: &str,
) -> (Vec<f64>, PassSummary) {
    let result = minimize(
        |v| match PolarizationParameters::from_slice(v) {
            Ok(p) => residual_norm(&p, trace, thermal_energy),
            Err(_) => f64::INFINITY,
        },
        start,
        simplex,
    );
    let summary = PassSummary {
        cost: result.value,
        evaluations: result.evaluations,
        iterations: result.iterations,
        converged: result.converged,
    };
    debug!(
        pass = label,
        cost = summary.cost,
        evaluations = summary.evaluations,
        converged = summary.converged,
        "polarization pass finished"
    );
    (result.x, summary)
}

/// Restart the minimizer from the previous optimum with a fresh simplex.
///
/// A collapsed simplex can report convergence away from the minimum; the
/// rebuilt simplex spans all six directions again.
fn refine_pass(
    trace: &PolarizationTrace,
    thermal_energy: f64,
    previous: &[f64],
    simplex: &SimplexConfig,
) -> (Vec<f64>, PassSummary) {
    run_pass(trace, thermal_energy, previous, simplex, "refine")
}

/// Full polarization fit with quality diagnostics.
///
/// After the initial pass the minimizer is restarted until a restart no
/// longer lowers the cost, at most `max_refine_passes` times.
pub fn fit_polarization(
    trace: &PolarizationTrace,
    config: &PolarizationFitConfig,
) -> Result<PolarizationFit, AppError> {
    config.validate()?;
    let kt = config.thermal_energy;
    let guess = guess_with(trace, config)?;

    let simplex = SimplexConfig {
        max_evaluations: config.max_function_evals.or(config.simplex.max_evaluations),
        ..config.simplex.clone()
    };

    let (mut best, first) = run_pass(trace, kt, &guess.to_array(), &simplex, "initial");
    let mut passes = vec![first];
    for _ in 0..config.max_refine_passes {
        let previous = passes[passes.len() - 1].cost;
        let (x, summary) = refine_pass(trace, kt, &best, &simplex);
        let improved = summary.cost < previous;
        if improved {
            best = x;
        }
        passes.push(summary);
        if !improved {
            break;
        }
    }

    let fitted = PolarizationParameters::from_slice(&best)?;
    let last = passes[passes.len() - 1];
    let cost = passes.iter().map(|p| p.cost).fold(f64::INFINITY, f64::min);
    let evaluations = passes.iter().map(|p| p.evaluations).sum();
    if !last.converged {
        warn!(
            evaluations = last.evaluations,
            "polarization pass stopped on budget before reaching tolerance"
        );
    }

    let residuals = polarization_residuals(trace, &fitted, kt);
    let quality = fit_quality(&residuals);
    info!(
        tunnel_coupling = fitted.tunnel_coupling,
        detuning_offset = fitted.detuning_offset,
        passes = passes.len(),
        rmse = quality.rmse,
        "polarization fit complete"
    );

    Ok(PolarizationFit {
        fitted,
        guess,
        cost,
        quality,
        converged: last.converged,
        evaluations,
        passes,
    })
}
