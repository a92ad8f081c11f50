//! Geometric model of an anticrossing.
//!
//! The feature is drawn as five lines in image-frame coordinates:
//!
//! - a polarization segment of length `arm_length` through the center at
//!   angle `ψ`, ending in the two triple points `p± = c ± (arm_length/2)·(cos ψ, sin ψ)`
//! - arms 1 and 4 as rays leaving `p+`, arms 2 and 3 as rays leaving `p-`
//!
//! Each line is a Gaussian ridge `height · exp(-d² / 2σ²)` with `σ = width/2`,
//! where `d` is the distance to the nearest line.

use nalgebra::DMatrix;

use crate::domain::{AnticrossingModelConfig, AnticrossingParameters};

/// Precomputed line geometry for one parameter vector.
#[derive(Debug, Clone, Copy)]
pub struct CrossGeometry {
    upper: [f64; 2],
    lower: [f64; 2],
    /// `(origin, unit direction)` for each arm, in parameter order.
    arms: [([f64; 2], [f64; 2]); 4],
}

impl CrossGeometry {
    pub fn new(params: &AnticrossingParameters) -> Self {
        let psi = params.polarization_angle_or_default();
        let half = 0.5 * params.arm_length;
        let (s, c) = psi.sin_cos();
        let upper = [params.center_x + half * c, params.center_y + half * s];
        let lower = [params.center_x - half * c, params.center_y - half * s];

        let dir = |a: f64| {
            let (s, c) = a.sin_cos();
            [c, s]
        };
        let [a1, a2, a3, a4] = params.angles;
        Self {
            upper,
            lower,
            arms: [
                (upper, dir(a1)),
                (lower, dir(a2)),
                (lower, dir(a3)),
                (upper, dir(a4)),
            ],
        }
    }

    /// Triple points `(p+, p-)`.
    pub fn triple_points(&self) -> ([f64; 2], [f64; 2]) {
        (self.upper, self.lower)
    }

    /// Squared distance from `(x, y)` to the nearest line of the model.
    pub fn distance_sq(&self, x: f64, y: f64) -> f64 {
        let mut best = segment_distance_sq(x, y, self.lower, self.upper);
        for (origin, dir) in &self.arms {
            best = best.min(ray_distance_sq(x, y, *origin, *dir));
        }
        best
    }
}

fn segment_distance_sq(x: f64, y: f64, a: [f64; 2], b: [f64; 2]) -> f64 {
    let vx = b[0] - a[0];
    let vy = b[1] - a[1];
    let len_sq = vx * vx + vy * vy;
    let px = x - a[0];
    let py = y - a[1];
    let t = if len_sq > 0.0 {
        ((px * vx + py * vy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = px - t * vx;
    let dy = py - t * vy;
    dx * dx + dy * dy
}

fn ray_distance_sq(x: f64, y: f64, origin: [f64; 2], dir: [f64; 2]) -> f64 {
    let px = x - origin[0];
    let py = y - origin[1];
    let t = (px * dir[0] + py * dir[1]).max(0.0);
    let dx = px - t * dir[0];
    let dy = py - t * dir[1];
    dx * dx + dy * dy
}

/// Ridge profile as a function of squared distance to a line.
#[inline]
pub fn ridge_profile(distance_sq: f64, line_width: f64, height: f64) -> f64 {
    let sigma = 0.5 * line_width;
    height * (-distance_sq / (2.0 * sigma * sigma)).exp()
}

/// Model value at an image-frame point.
#[inline]
pub fn model_value(geometry: &CrossGeometry, x: f64, y: f64, config: &AnticrossingModelConfig) -> f64 {
    ridge_profile(geometry.distance_sq(x, y), config.line_width, config.height)
}

/// Offset of patch sample `k` from the patch center.
#[inline]
pub fn patch_offset(k: usize, config: &AnticrossingModelConfig) -> f64 {
    let half = (config.window_size as f64 - 1.0) / 2.0;
    (k as f64 - half) * config.model_step
}

/// Render the square model patch centered on the parameters' center.
///
/// Sample `(i, j)` sits at `(center_x + offset(j), center_y + offset(i))`.
pub fn render_patch(params: &AnticrossingParameters, config: &AnticrossingModelConfig) -> DMatrix<f64> {
    let geometry = CrossGeometry::new(params);
    let n = config.window_size;
    DMatrix::from_fn(n, n, |i, j| {
        let x = params.center_x + patch_offset(j, config);
        let y = params.center_y + patch_offset(i, config);
        model_value(&geometry, x, y, config)
    })
}

/// Render the model over a full image grid with spacing `step`.
pub fn render_image(
    params: &AnticrossingParameters,
    rows: usize,
    cols: usize,
    step: f64,
    config: &AnticrossingModelConfig,
) -> DMatrix<f64> {
    let geometry = CrossGeometry::new(params);
    DMatrix::from_fn(rows, cols, |r, c| {
        model_value(&geometry, c as f64 * step, r as f64 * step, config)
    })
}
