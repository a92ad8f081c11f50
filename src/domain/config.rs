//! Configuration structs for both pipelines.
//!
//! Every default below is a calibrated constant inherited from the lab tooling
//! these fits were first developed in. They are passed at the call boundary so
//! the optimizers themselves contain no magic numbers.

use serde::{Deserialize, Serialize};

use crate::domain::{CostMode, DerivativeMode};
use crate::error::AppError;

/// Image preprocessing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub derivative: DerivativeMode,
    /// Gaussian smoothing scale in raw scan pixels.
    pub smoothing_sigma: f64,
    /// Output grid spacing (`istep`) in physical units.
    pub target_step: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            derivative: DerivativeMode::Dx,
            smoothing_sigma: 0.93,
            target_step: 0.25,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.smoothing_sigma.is_finite() && self.smoothing_sigma >= 0.0) {
            return Err(AppError::invalid_config(format!(
                "Smoothing sigma must be finite and >= 0, got {}.",
                self.smoothing_sigma
            )));
        }
        if !(self.target_step.is_finite() && self.target_step > 0.0) {
            return Err(AppError::degenerate_input(format!(
                "Target step must be finite and > 0, got {}.",
                self.target_step
            )));
        }
        Ok(())
    }
}

/// Anticrossing model rendering and cost options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnticrossingModelConfig {
    /// Patch side length, in model samples.
    pub window_size: usize,
    /// Spacing of the model samples in physical units.
    pub model_step: f64,
    /// Full width of the rendered lines.
    pub line_width: f64,
    /// Peak model value; matches the preprocessing reference level.
    pub height: f64,
    pub cost_mode: CostMode,
}

impl Default for AnticrossingModelConfig {
    fn default() -> Self {
        Self {
            window_size: 31,
            model_step: 0.5,
            line_width: 2.5,
            height: 100.0,
            cost_mode: CostMode::Absolute,
        }
    }
}

impl AnticrossingModelConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.window_size < 2 {
            return Err(AppError::invalid_config(format!(
                "Window size must be >= 2 samples, got {}.",
                self.window_size
            )));
        }
        if !(self.model_step.is_finite() && self.model_step > 0.0) {
            return Err(AppError::invalid_config(format!(
                "Model step must be finite and > 0, got {}.",
                self.model_step
            )));
        }
        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err(AppError::invalid_config(format!(
                "Line width must be finite and > 0, got {}.",
                self.line_width
            )));
        }
        if !self.height.is_finite() {
            return Err(AppError::invalid_config("Model height must be finite."));
        }
        Ok(())
    }
}

/// Nelder–Mead stopping rules and initial simplex shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplexConfig {
    /// Iteration cap; `None` means `200 * dim`.
    pub max_iterations: Option<usize>,
    /// Cost-evaluation cap; `None` means `200 * dim`.
    pub max_evaluations: Option<usize>,
    /// Simplex spread in parameter space below which we stop.
    pub x_tol: f64,
    /// Spread of simplex costs below which we stop.
    pub f_tol: f64,
    /// Relative perturbation of each coordinate for the initial simplex.
    pub initial_step_rel: f64,
    /// Absolute perturbation used for coordinates that start at zero.
    pub initial_step_zero: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            max_evaluations: None,
            x_tol: 1e-4,
            f_tol: 1e-4,
            initial_step_rel: 0.05,
            initial_step_zero: 0.00025,
        }
    }
}

impl SimplexConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_iterations == Some(0) || self.max_evaluations == Some(0) {
            return Err(AppError::invalid_config("Simplex budgets must be > 0."));
        }
        if !(self.x_tol.is_finite() && self.x_tol >= 0.0 && self.f_tol.is_finite() && self.f_tol >= 0.0)
        {
            return Err(AppError::invalid_config("Simplex tolerances must be finite and >= 0."));
        }
        if !(self.initial_step_rel.is_finite()
            && self.initial_step_rel != 0.0
            && self.initial_step_zero.is_finite()
            && self.initial_step_zero != 0.0)
        {
            return Err(AppError::invalid_config("Initial simplex steps must be finite and non-zero."));
        }
        Ok(())
    }
}

/// Overrides for the default anticrossing starting point.
///
/// Unset fields fall back to [`AnticrossingGuess::DEFAULT_ARM_LENGTH`],
/// [`AnticrossingGuess::DEFAULT_ANGLES`] and the image center.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnticrossingGuess {
    pub center: Option<[f64; 2]>,
    pub arm_length: Option<f64>,
    pub angles: Option<[f64; 4]>,
    /// When set, the polarization angle becomes a fitted parameter.
    pub polarization_angle: Option<f64>,
}

impl AnticrossingGuess {
    pub const DEFAULT_ARM_LENGTH: f64 = 3.5;
    /// Up, left, down and right arms of a typical honeycomb vertex pair.
    pub const DEFAULT_ANGLES: [f64; 4] = [1.17809725, 3.5, 4.3196899, 0.39269908];
}

/// Full configuration of an anticrossing fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnticrossingFitConfig {
    pub preprocess: PreprocessConfig,
    pub model: AnticrossingModelConfig,
    /// Applied to each of the two passes.
    pub simplex: SimplexConfig,
    pub initial: AnticrossingGuess,
    /// Fit the polarization angle when the initial guess carries one.
    pub refit_polarization_angle: bool,
    /// Produce an [`crate::domain::AnticrossingDiagnostics`] bundle.
    pub diagnostics: bool,
}

impl Default for AnticrossingFitConfig {
    fn default() -> Self {
        Self {
            preprocess: PreprocessConfig::default(),
            model: AnticrossingModelConfig::default(),
            simplex: SimplexConfig {
                max_iterations: Some(3000),
                max_evaluations: Some(3000),
                x_tol: 1e-6,
                f_tol: 1e-8,
                ..SimplexConfig::default()
            },
            initial: AnticrossingGuess::default(),
            refit_polarization_angle: true,
            diagnostics: false,
        }
    }
}

/// Full configuration of a polarization-line fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolarizationFitConfig {
    /// `kT` in detuning units; fixed, never fitted.
    pub thermal_energy: f64,
    /// Cap on cost evaluations per pass; `None` means `200 * 6`.
    pub max_function_evals: Option<usize>,
    /// Starting tunnel coupling (4.2 / 80).
    pub tunnel_coupling_guess: f64,
    /// Gaussian scale, in samples, of the derivative used to find the transition.
    pub derivative_sigma: f64,
    /// Fraction of the trace (taken from the end) used for the slope regression.
    pub tail_fraction: f64,
    /// Upper bound on simplex restarts after the initial pass. Restarts stop
    /// early once one fails to lower the cost.
    pub max_refine_passes: usize,
    /// Applied to each pass; `max_function_evals` overrides its evaluation cap.
    pub simplex: SimplexConfig,
}

impl Default for PolarizationFitConfig {
    fn default() -> Self {
        Self {
            thermal_energy: 0.001,
            max_function_evals: None,
            tunnel_coupling_guess: 4.2 / 80.0,
            derivative_sigma: 5.0,
            tail_fraction: 0.1,
            max_refine_passes: 10,
            simplex: SimplexConfig::default(),
        }
    }
}

impl PolarizationFitConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.thermal_energy.is_finite() && self.thermal_energy > 0.0) {
            return Err(AppError::invalid_config(format!(
                "Thermal energy must be finite and > 0, got {}.",
                self.thermal_energy
            )));
        }
        if self.max_function_evals == Some(0) {
            return Err(AppError::invalid_config("Function evaluation cap must be > 0."));
        }
        if !self.tunnel_coupling_guess.is_finite() {
            return Err(AppError::invalid_config("Tunnel coupling guess must be finite."));
        }
        if !(self.derivative_sigma.is_finite() && self.derivative_sigma > 0.0) {
            return Err(AppError::invalid_config("Derivative sigma must be finite and > 0."));
        }
        if !(self.tail_fraction.is_finite() && self.tail_fraction > 0.0 && self.tail_fraction <= 1.0) {
            return Err(AppError::invalid_config("Tail fraction must be in (0, 1]."));
        }
        self.simplex.validate()
    }
}
