//! Synthetic measurements for tests, benchmarks and notebook demos.
//!
//! Both generators render the noiseless model and optionally add white
//! Gaussian noise from a seeded `StdRng`, so a given seed always yields the
//! same data. With `noise_sigma == 0` no random numbers are drawn and the
//! output equals the model exactly.

use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{
    AnticrossingModelConfig, AnticrossingParameters, PolarizationParameters, PolarizationTrace, Scan2D,
    ScanExtent,
};
use crate::error::AppError;
use crate::models::{CrossGeometry, model_value, signal_at};

fn noise_source(noise_sigma: f64, seed: u64) -> Result<Option<(StdRng, Normal<f64>)>, AppError> {
    if !(noise_sigma.is_finite() && noise_sigma >= 0.0) {
        return Err(AppError::invalid_config(format!(
            "Noise sigma must be finite and >= 0, got {noise_sigma}."
        )));
    }
    if noise_sigma == 0.0 {
        return Ok(None);
    }
    let normal = Normal::new(0.0, noise_sigma)
        .map_err(|e| AppError::invalid_config(format!("Noise distribution error: {e}")))?;
    Ok(Some((StdRng::seed_from_u64(seed), normal)))
}

/// Polarization-line trace over `detuning`.
pub fn synthetic_polarization_trace(
    detuning: Vec<f64>,
    params: &PolarizationParameters,
    thermal_energy: f64,
    noise_sigma: f64,
    seed: u64,
) -> Result<PolarizationTrace, AppError> {
    let mut noise = noise_source(noise_sigma, seed)?;
    let signal = detuning
        .iter()
        .map(|&x| {
            let clean = signal_at(x, params, thermal_energy);
            match noise.as_mut() {
                Some((rng, normal)) => clean + normal.sample(rng),
                None => clean,
            }
        })
        .collect();
    PolarizationTrace::new(detuning, signal)
}

/// Raw 2D scan of an anticrossing with peak value `amplitude`.
///
/// `params` are image-frame coordinates, i.e. relative to
/// `(extent.x_min, extent.y_min)`. `shape` is `(rows, cols)`; rows follow y.
pub fn synthetic_anticrossing_scan(
    params: &AnticrossingParameters,
    shape: (usize, usize),
    extent: ScanExtent,
    amplitude: f64,
    noise_sigma: f64,
    seed: u64,
) -> Result<Scan2D, AppError> {
    if !amplitude.is_finite() {
        return Err(AppError::invalid_config("Amplitude must be finite."));
    }
    let (rows, cols) = shape;
    let mut scan = Scan2D::new(DMatrix::zeros(rows, cols), extent);
    let (step_x, step_y) = scan.steps()?;

    let model = AnticrossingModelConfig {
        height: amplitude,
        ..AnticrossingModelConfig::default()
    };
    let geometry = CrossGeometry::new(params);
    let mut noise = noise_source(noise_sigma, seed)?;

    // Row-major draw order keeps the noise layout independent of storage order.
    for r in 0..rows {
        for c in 0..cols {
            let mut v = model_value(&geometry, c as f64 * step_x, r as f64 * step_y, &model);
            if let Some((rng, normal)) = noise.as_mut() {
                v += normal.sample(rng);
            }
            scan.data[(r, c)] = v;
        }
    }
    Ok(scan)
}
