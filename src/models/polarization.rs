//! Two-level polarization-line model.
//!
//! For detuning `x` (relative to the transition center), tunnel coupling `t`
//! and thermal energy `kT`:
//!
//! - `Ω = sqrt(x² + 4t²)` is the level splitting
//! - `E = ½ (1 + (x/Ω) tanh(Ω / 2kT))` is the excess-charge occupation
//! - the sensor background follows a slope that moves from `slope_left` to
//!   `slope_right` with `E`, and the charge step adds `E · sensitivity`
//!
//! Numerical notes:
//! - `Ω = 0` only happens for `x = 0` and `t = 0`. We take `x/Ω = 0` there,
//!   which is the symmetric limit (`E = ½`).

use crate::domain::PolarizationParameters;

/// Occupation fraction `E(x)` for detuning `x` already relative to the offset.
pub fn occupation(x: f64, tunnel_coupling: f64, thermal_energy: f64) -> f64 {
    let omega = (x * x + 4.0 * tunnel_coupling * tunnel_coupling).sqrt();
    let ratio = if omega > 0.0 { x / omega } else { 0.0 };
    0.5 * (1.0 + ratio * (omega / (2.0 * thermal_energy)).tanh())
}

/// Sensor signal at a single detuning value.
pub fn signal_at(detuning: f64, params: &PolarizationParameters, thermal_energy: f64) -> f64 {
    let x = detuning - params.detuning_offset;
    let e = occupation(x, params.tunnel_coupling, thermal_energy);
    let slope = params.slope_left + (params.slope_right - params.slope_left) * e;
    params.sensor_offset + x * slope + e * params.sensitivity
}

/// Evaluate the model over a detuning axis.
pub fn evaluate(detuning: &[f64], params: &PolarizationParameters, thermal_energy: f64) -> Vec<f64> {
    detuning
        .iter()
        .map(|&x| signal_at(x, params, thermal_energy))
        .collect()
}
