//! Two-pass anticrossing fit.
//!
//! Pass 1 runs the simplex from the initial vector. The refinement pass
//! restarts it from the pass-1 optimum with a freshly built simplex, which
//! recovers from the simplex collapsing along a poorly scaled direction (the
//! angles and the center live on very different scales).
//!
//! The variable vector is the 7 required parameters, plus the polarization
//! angle when the initial guess carries one and refitting is enabled. A held
//! angle is still reported so every result has all 8 entries.

use tracing::{debug, info, warn};

use crate::domain::{
    AnticrossingDiagnostics, AnticrossingFit, AnticrossingFitConfig, AnticrossingGuess,
    AnticrossingModelConfig, AnticrossingParameters, PassSummary, ProcessedImage, Scan2D, SimplexConfig,
};
use crate::error::AppError;
use crate::fit::cost::{cost, evaluate};
use crate::fit::simplex::minimize;
use crate::image::preprocess_with;

/// Starting point built from the image size and the configured overrides.
///
/// The default center is half a pixel past the middle of the image.
pub fn default_initial_guess(image: &ProcessedImage, guess: &AnticrossingGuess) -> AnticrossingParameters {
    let [cx, cy] = guess.center.unwrap_or([
        (image.cols() as f64 / 2.0 + 0.5) * image.step,
        (image.rows() as f64 / 2.0 + 0.5) * image.step,
    ]);
    let params = AnticrossingParameters::new(
        cx,
        cy,
        guess.arm_length.unwrap_or(AnticrossingGuess::DEFAULT_ARM_LENGTH),
        guess.angles.unwrap_or(AnticrossingGuess::DEFAULT_ANGLES),
    );
    match guess.polarization_angle {
        Some(psi) => params.with_polarization_angle(psi),
        None => params,
    }
}

/// Cost landscape seen by the minimizer.
struct Problem<'a> {
    target: &'a ProcessedImage,
    model: &'a AnticrossingModelConfig,
    /// Polarization angle used when it is not a variable.
    held_angle: f64,
    fit_angle: bool,
}

impl Problem<'_> {
    fn unpack(&self, v: &[f64]) -> AnticrossingParameters {
        let psi = if self.fit_angle { v[7] } else { self.held_angle };
        AnticrossingParameters {
            center_x: v[0],
            center_y: v[1],
            arm_length: v[2],
            angles: [v[3], v[4], v[5], v[6]],
            polarization_angle: Some(psi),
        }
    }

    fn pack(&self, params: &AnticrossingParameters) -> Vec<f64> {
        let mut v = Vec::with_capacity(8);
        v.extend_from_slice(&[params.center_x, params.center_y, params.arm_length]);
        v.extend_from_slice(&params.angles);
        if self.fit_angle {
            v.push(params.polarization_angle_or_default());
        }
        v
    }

    fn run(&self, start: &[f64], simplex: &SimplexConfig, label: &str) -> (Vec<f64>, PassSummary) {
        let result = minimize(|v| cost(&self.unpack(v), self.target, self.model), start, simplex);
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
            "anticrossing pass finished"
        );
        if !summary.converged {
            warn!(pass = label, evaluations = summary.evaluations, "anticrossing pass hit its budget");
        }
        (result.x, summary)
    }
}

fn coarse_pass(problem: &Problem<'_>, initial: &[f64], simplex: &SimplexConfig) -> (Vec<f64>, PassSummary) {
    problem.run(initial, simplex, "coarse")
}

/// Restart the minimizer from the coarse optimum.
fn refine_pass(problem: &Problem<'_>, coarse: &[f64], simplex: &SimplexConfig) -> (Vec<f64>, PassSummary) {
    problem.run(coarse, simplex, "refine")
}

/// Fit the anticrossing model to a preprocessed image.
pub fn fit(
    initial: &AnticrossingParameters,
    target: &ProcessedImage,
    config: &AnticrossingFitConfig,
) -> Result<AnticrossingFit, AppError> {
    config.model.validate()?;
    config.simplex.validate()?;
    if target.rows() < 2 || target.cols() < 2 {
        return Err(AppError::degenerate_input(format!(
            "Target image must be at least 2x2, got {}x{}.",
            target.rows(),
            target.cols()
        )));
    }
    if !(target.step.is_finite() && target.step > 0.0) {
        return Err(AppError::degenerate_input(format!(
            "Target image step must be finite and > 0, got {}.",
            target.step
        )));
    }
    if initial.to_vec().iter().any(|v| !v.is_finite()) {
        return Err(AppError::degenerate_input("Initial anticrossing parameters must be finite."));
    }

    let problem = Problem {
        target,
        model: &config.model,
        held_angle: initial.polarization_angle_or_default(),
        fit_angle: initial.polarization_angle.is_some() && config.refit_polarization_angle,
    };

    let start = problem.pack(initial);
    let (coarse, first) = coarse_pass(&problem, &start, &config.simplex);
    let (refined, second) = refine_pass(&problem, &coarse, &config.simplex);
    let parameters = problem.unpack(&refined);

    info!(
        center_x = parameters.center_x,
        center_y = parameters.center_y,
        arm_length = parameters.arm_length,
        cost = second.cost,
        "anticrossing fit complete"
    );

    Ok(AnticrossingFit {
        parameters,
        cost: second.cost,
        passes: vec![first, second],
    })
}

/// Preprocess a raw scan, seed the fit and run it.
///
/// Diagnostics are produced only when `config.diagnostics` is set.
pub fn fit_anticrossing(
    scan: &Scan2D,
    config: &AnticrossingFitConfig,
) -> Result<(AnticrossingFit, Option<AnticrossingDiagnostics>), AppError> {
    let pre = preprocess_with(scan, &config.preprocess)?;
    let initial = default_initial_guess(&pre.image, &config.initial);
    let result = fit(&initial, &pre.image, config)?;

    let diagnostics = if config.diagnostics {
        let (cost, maps) = evaluate(&result.parameters, &pre.image, &config.model, true);
        maps.map(|m| AnticrossingDiagnostics {
            cost,
            patch: m.patch,
            residual: m.residual,
            image: pre.image.clone(),
        })
    } else {
        None
    };

    Ok((result, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_4;

    use nalgebra::DMatrix;

    use crate::domain::CostMode;
    use crate::error::ErrorKind;
    use crate::models::render_image;

    fn squared_config() -> AnticrossingFitConfig {
        let mut cfg = AnticrossingFitConfig::default();
        cfg.model.cost_mode = CostMode::Squared;
        cfg
    }

    fn target(truth: &AnticrossingParameters, cfg: &AnticrossingFitConfig) -> ProcessedImage {
        ProcessedImage {
            data: render_image(truth, 61, 61, 0.5, &cfg.model),
            step: 0.5,
            origin: [0.0, 0.0],
        }
    }

    fn truth() -> AnticrossingParameters {
        AnticrossingParameters::new(15.0, 15.0, 3.5, [1.0, 2.0, 3.0, 4.0])
    }

    fn perturbed_start() -> AnticrossingParameters {
        AnticrossingParameters::new(14.0, 16.0, 3.0, [1.1, 1.9, 3.1, 3.9])
    }

    fn assert_recovered(p: &AnticrossingParameters, tol: f64) {
        assert!((p.center_x - 15.0).abs() < tol, "{p:?}");
        assert!((p.center_y - 15.0).abs() < tol, "{p:?}");
        assert!((p.arm_length - 3.5).abs() < tol, "{p:?}");
        for (got, want) in p.angles.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((got - want).abs() < tol, "{p:?}");
        }
        assert_eq!(p.polarization_angle, Some(FRAC_PI_4));
    }

    #[test]
    fn recovers_synthetic_anticrossing_squared() {
        let cfg = squared_config();
        let image = target(&truth(), &cfg);

        let fit = fit(&perturbed_start(), &image, &cfg).unwrap();
        assert_eq!(fit.passes.len(), 2);
        // 1e-6 of the squared value scale is 1e-2; noiseless data does far better.
        assert!(fit.cost < 1e-6, "cost {}", fit.cost);
        assert_recovered(&fit.parameters, 1e-3);
    }

    #[test]
    fn recovers_synthetic_anticrossing_absolute() {
        let cfg = AnticrossingFitConfig::default();
        assert_eq!(cfg.model.cost_mode, CostMode::Absolute);
        let image = target(&truth(), &cfg);

        let fit = fit(&perturbed_start(), &image, &cfg).unwrap();
        assert!(fit.cost < 1e-4, "cost {}", fit.cost);
        assert!(fit.passes[1].cost <= fit.passes[0].cost);
        assert_recovered(&fit.parameters, 1e-3);
    }

    #[test]
    fn held_polarization_angle_is_reported_unchanged() {
        let mut cfg = squared_config();
        cfg.refit_polarization_angle = false;
        cfg.simplex.max_evaluations = Some(200);
        let image = target(&truth(), &cfg);
        let start = truth().with_polarization_angle(0.9);

        let fit = fit(&start, &image, &cfg).unwrap();
        assert_eq!(fit.parameters.polarization_angle, Some(0.9));
    }

    #[test]
    fn fit_is_deterministic() {
        let mut cfg = squared_config();
        cfg.simplex.max_evaluations = Some(300);
        let image = target(&truth(), &cfg);
        let a = fit(&perturbed_start(), &image, &cfg).unwrap();
        let b = fit(&perturbed_start(), &image, &cfg).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn default_guess_uses_image_center_and_calibrated_shape() {
        let image = ProcessedImage {
            data: DMatrix::zeros(40, 60),
            step: 0.25,
            origin: [1.0, 2.0],
        };
        let p = default_initial_guess(&image, &AnticrossingGuess::default());
        assert!((p.center_x - 7.625).abs() < 1e-12);
        assert!((p.center_y - 5.125).abs() < 1e-12);
        assert_eq!(p.arm_length, AnticrossingGuess::DEFAULT_ARM_LENGTH);
        assert_eq!(p.angles, AnticrossingGuess::DEFAULT_ANGLES);
        assert_eq!(p.polarization_angle, None);

        let overridden = AnticrossingGuess {
            arm_length: Some(2.0),
            polarization_angle: Some(0.5),
            ..AnticrossingGuess::default()
        };
        let p = default_initial_guess(&image, &overridden);
        assert_eq!(p.arm_length, 2.0);
        assert_eq!(p.polarization_angle, Some(0.5));
    }

    #[test]
    fn rejects_invalid_model_config() {
        let mut cfg = AnticrossingFitConfig::default();
        cfg.model.window_size = 0;
        let image = target(&truth(), &cfg);
        let err = fit(&truth(), &image, &cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }
}
