//! Anticrossing cost evaluator.
//!
//! The model patch is laid over the processed image at the model's own center:
//! patch sample `(i, j)` sits at image-frame point
//! `(center_x + offset(j), center_y + offset(i))`, and the image is sampled
//! there bilinearly (in pixel units, `x / istep`). Because the compared sample
//! set travels with the center, the cost is continuous in every parameter.
//!
//! [`cost`] is the hot path used by the optimizer and allocates nothing;
//! [`evaluate`] additionally returns the patch and residual maps on request.

use nalgebra::DMatrix;

use crate::domain::{AnticrossingModelConfig, AnticrossingParameters, CostMode, ProcessedImage};
use crate::math::bilinear_clamped;
use crate::models::{CrossGeometry, model_value, patch_offset};

/// Patch-sized maps for inspecting a single evaluation.
#[derive(Debug, Clone)]
pub struct CostDiagnostics {
    pub patch: DMatrix<f64>,
    /// `model - target` per patch sample.
    pub residual: DMatrix<f64>,
}

/// Contribution of one residual to the cost.
#[inline]
pub fn residual_term(residual: f64, mode: CostMode) -> f64 {
    match mode {
        CostMode::Absolute => residual.abs(),
        CostMode::Squared => residual * residual,
    }
}

/// Model value and image value at patch sample `(i, j)`.
#[inline]
fn sample_pair(
    geometry: &CrossGeometry,
    params: &AnticrossingParameters,
    target: &ProcessedImage,
    config: &AnticrossingModelConfig,
    i: usize,
    j: usize,
) -> (f64, f64) {
    let x = params.center_x + patch_offset(j, config);
    let y = params.center_y + patch_offset(i, config);
    let model = model_value(geometry, x, y, config);
    let image = bilinear_clamped(&target.data, x / target.step, y / target.step);
    (model, image)
}

/// Mean per-sample cost of `params` against `target`.
pub fn cost(
    params: &AnticrossingParameters,
    target: &ProcessedImage,
    config: &AnticrossingModelConfig,
) -> f64 {
    let geometry = CrossGeometry::new(params);
    let n = config.window_size;
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            let (model, image) = sample_pair(&geometry, params, target, config, i, j);
            total += residual_term(model - image, config.cost_mode);
        }
    }
    total / (n * n) as f64
}

/// Cost plus, when `with_diagnostics` is set, the patch and residual maps.
pub fn evaluate(
    params: &AnticrossingParameters,
    target: &ProcessedImage,
    config: &AnticrossingModelConfig,
    with_diagnostics: bool,
) -> (f64, Option<CostDiagnostics>) {
    if !with_diagnostics {
        return (cost(params, target, config), None);
    }

    let geometry = CrossGeometry::new(params);
    let n = config.window_size;
    let mut patch = DMatrix::<f64>::zeros(n, n);
    let mut residual = DMatrix::<f64>::zeros(n, n);
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            let (model, image) = sample_pair(&geometry, params, target, config, i, j);
            patch[(i, j)] = model;
            residual[(i, j)] = model - image;
            total += residual_term(model - image, config.cost_mode);
        }
    }
    let value = total / (n * n) as f64;
    (value, Some(CostDiagnostics { patch, residual }))
}
