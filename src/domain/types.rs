//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - handed to plotting/persistence layers outside this crate
//! - compared in regression tests

use std::f64::consts::FRAC_PI_4;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Polarization-line angle used when the caller does not supply one.
pub const DEFAULT_POLARIZATION_ANGLE: f64 = FRAC_PI_4;

/// Physical extent of a 2D scan (gate voltages of the first and last sample).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl ScanExtent {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn span_x(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn span_y(&self) -> f64 {
        self.y_max - self.y_min
    }
}

/// A raw 2D charge-stability measurement.
///
/// Rows follow the y axis and columns the x axis. The first row/column sits at
/// `(x_min, y_min)` and the last at `(x_max, y_max)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan2D {
    pub data: DMatrix<f64>,
    pub extent: ScanExtent,
}

impl Scan2D {
    pub fn new(data: DMatrix<f64>, extent: ScanExtent) -> Self {
        Self { data, extent }
    }

    /// Grid spacing `(step_x, step_y)` in physical units.
    ///
    /// Fails when the scan has fewer than two samples along an axis or when an
    /// extent span is not strictly positive.
    pub fn steps(&self) -> Result<(f64, f64), AppError> {
        let (rows, cols) = self.data.shape();
        if rows < 2 || cols < 2 {
            return Err(AppError::degenerate_input(format!(
                "Scan must have at least 2x2 samples, got {rows}x{cols}."
            )));
        }
        let span_x = self.extent.span_x();
        let span_y = self.extent.span_y();
        if !(span_x.is_finite() && span_y.is_finite() && span_x > 0.0 && span_y > 0.0) {
            return Err(AppError::degenerate_input(format!(
                "Scan extent must have positive spans, got x={span_x}, y={span_y}."
            )));
        }
        Ok((span_x / (cols - 1) as f64, span_y / (rows - 1) as f64))
    }
}

/// Which derivative of the smoothed scan feeds the fit.
///
/// Differentiating suppresses slow sensor drift (`Dx`/`Dy`) or cross-talk
/// along one gate direction (`Dxy`, `XMinusY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivativeMode {
    None,
    Dx,
    Dy,
    /// `d/dx + d/dy`
    Dxy,
    /// `d/dx - d/dy`
    #[serde(rename = "xmy")]
    XMinusY,
}

impl DerivativeMode {
    pub fn label(self) -> &'static str {
        match self {
            DerivativeMode::None => "none",
            DerivativeMode::Dx => "dx",
            DerivativeMode::Dy => "dy",
            DerivativeMode::Dxy => "dxy",
            DerivativeMode::XMinusY => "xmy",
        }
    }
}

impl std::str::FromStr for DerivativeMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(DerivativeMode::None),
            "dx" => Ok(DerivativeMode::Dx),
            "dy" => Ok(DerivativeMode::Dy),
            "dxy" => Ok(DerivativeMode::Dxy),
            "xmy" => Ok(DerivativeMode::XMinusY),
            other => Err(AppError::invalid_config(format!(
                "Unknown derivative mode '{other}' (expected none, dx, dy, dxy or xmy)."
            ))),
        }
    }
}

/// A denoised scan resampled onto a square grid of spacing `step`.
///
/// Image-frame coordinates of pixel `(row, col)` are `(col * step, row * step)`;
/// `origin` is the scan coordinate of pixel `(0, 0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub data: DMatrix<f64>,
    pub step: f64,
    pub origin: [f64; 2],
}

impl ProcessedImage {
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Map an image-frame point back to scan (gate voltage) coordinates.
    pub fn to_scan_coordinates(&self, x: f64, y: f64) -> [f64; 2] {
        [self.origin[0] + x, self.origin[1] + y]
    }
}

/// How pixel residuals are reduced to a scalar cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostMode {
    /// Mean absolute residual.
    Absolute,
    /// Mean squared residual.
    Squared,
}

/// Geometric parameters of an anticrossing, in image-frame units and radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnticrossingParameters {
    pub center_x: f64,
    pub center_y: f64,
    /// Length of the polarization segment; the arms start at its two ends.
    pub arm_length: f64,
    /// Arm directions. Arms 1 and 4 leave the upper triple point, arms 2 and 3
    /// the lower one.
    pub angles: [f64; 4],
    /// Angle of the polarization line. `None` means "use the default and do
    /// not fit it".
    pub polarization_angle: Option<f64>,
}

impl AnticrossingParameters {
    pub fn new(center_x: f64, center_y: f64, arm_length: f64, angles: [f64; 4]) -> Self {
        Self {
            center_x,
            center_y,
            arm_length,
            angles,
            polarization_angle: None,
        }
    }

    pub fn with_polarization_angle(mut self, psi: f64) -> Self {
        self.polarization_angle = Some(psi);
        self
    }

    pub fn polarization_angle_or_default(&self) -> f64 {
        self.polarization_angle
            .unwrap_or(DEFAULT_POLARIZATION_ANGLE)
    }

    /// Flat vector: 7 entries, plus the polarization angle when present.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&[self.center_x, self.center_y, self.arm_length]);
        out.extend_from_slice(&self.angles);
        if let Some(psi) = self.polarization_angle {
            out.push(psi);
        }
        out
    }

    /// Inverse of [`Self::to_vec`]; accepts 7 or 8 entries.
    pub fn from_slice(values: &[f64]) -> Result<Self, AppError> {
        if values.len() != 7 && values.len() != 8 {
            return Err(AppError::shape_mismatch(format!(
                "Anticrossing parameters need 7 or 8 values, got {}.",
                values.len()
            )));
        }
        Ok(Self {
            center_x: values[0],
            center_y: values[1],
            arm_length: values[2],
            angles: [values[3], values[4], values[5], values[6]],
            polarization_angle: values.get(7).copied(),
        })
    }
}

/// Summary of one optimizer pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassSummary {
    pub cost: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Result of the two-pass anticrossing fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnticrossingFit {
    /// Fitted parameters; the polarization angle is always populated.
    pub parameters: AnticrossingParameters,
    pub cost: f64,
    /// Coarse pass first, refinement pass second.
    pub passes: Vec<PassSummary>,
}

/// Optional artifacts for inspecting an anticrossing fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnticrossingDiagnostics {
    pub cost: f64,
    /// Model values on the patch grid.
    pub patch: DMatrix<f64>,
    /// `model - target` on the patch grid.
    pub residual: DMatrix<f64>,
    /// The preprocessed image the model was compared against.
    pub image: ProcessedImage,
}

/// A 1D bias sweep across a polarization line.
///
/// Construct with [`PolarizationTrace::new`], which enforces equal lengths,
/// finite values and a strictly monotonic detuning axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarizationTrace {
    detuning: Vec<f64>,
    signal: Vec<f64>,
}

impl PolarizationTrace {
    pub fn new(detuning: Vec<f64>, signal: Vec<f64>) -> Result<Self, AppError> {
        if detuning.len() != signal.len() {
            return Err(AppError::shape_mismatch(format!(
                "Detuning has {} points but signal has {}.",
                detuning.len(),
                signal.len()
            )));
        }
        if detuning.iter().chain(signal.iter()).any(|v| !v.is_finite()) {
            return Err(AppError::degenerate_input("Trace contains non-finite values."));
        }
        let increasing = detuning.windows(2).all(|w| w[1] > w[0]);
        let decreasing = detuning.windows(2).all(|w| w[1] < w[0]);
        if !(increasing || decreasing) {
            return Err(AppError::degenerate_input(
                "Detuning axis must be strictly monotonic.",
            ));
        }
        Ok(Self { detuning, signal })
    }

    pub fn detuning(&self) -> &[f64] {
        &self.detuning
    }

    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    pub fn len(&self) -> usize {
        self.detuning.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detuning.is_empty()
    }
}

/// Parameters of the two-level polarization model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarizationParameters {
    /// Tunnel coupling `t` (same units as detuning).
    pub tunnel_coupling: f64,
    /// Detuning at the center of the transition.
    pub detuning_offset: f64,
    /// Sensor background at the transition center.
    pub sensor_offset: f64,
    pub slope_left: f64,
    pub slope_right: f64,
    /// Signal step across the transition.
    pub sensitivity: f64,
}

impl PolarizationParameters {
    pub const LEN: usize = 6;

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.tunnel_coupling,
            self.detuning_offset,
            self.sensor_offset,
            self.slope_left,
            self.slope_right,
            self.sensitivity,
        ]
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, AppError> {
        if values.len() != Self::LEN {
            return Err(AppError::shape_mismatch(format!(
                "Polarization parameters need {} values, got {}.",
                Self::LEN,
                values.len()
            )));
        }
        Ok(Self {
            tunnel_coupling: values[0],
            detuning_offset: values[1],
            sensor_offset: values[2],
            slope_left: values[3],
            slope_right: values[4],
            sensitivity: values[5],
        })
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub max_abs_residual: f64,
    pub n: usize,
}

/// Output of a polarization-line fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarizationFit {
    pub fitted: PolarizationParameters,
    /// Heuristic starting point the optimizer was seeded with.
    pub guess: PolarizationParameters,
    /// Residual norm at `fitted`.
    pub cost: f64,
    pub quality: FitQuality,
    /// Whether the last pass stopped on tolerance.
    pub converged: bool,
    /// Total over all passes.
    pub evaluations: usize,
    /// Initial pass first, then each refinement restart.
    pub passes: Vec<PassSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn trace_rejects_unequal_lengths() {
        let err = PolarizationTrace::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn trace_rejects_non_monotonic_detuning() {
        let err = PolarizationTrace::new(vec![0.0, 2.0, 1.0], vec![0.0; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegenerateInput);
    }

    #[test]
    fn trace_accepts_decreasing_detuning() {
        let trace = PolarizationTrace::new(vec![2.0, 1.0, 0.0], vec![0.0; 3]).unwrap();
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn anticrossing_vector_layout() {
        let p = AnticrossingParameters::new(1.0, 2.0, 3.0, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(p.to_vec().len(), 7);
        let with_psi = p.with_polarization_angle(0.5);
        let v = with_psi.to_vec();
        assert_eq!(v.len(), 8);
        assert_eq!(AnticrossingParameters::from_slice(&v).unwrap(), with_psi);
        assert!(AnticrossingParameters::from_slice(&v[..5]).is_err());
    }

    #[test]
    fn scan_steps_reject_degenerate_extent() {
        let scan = Scan2D::new(DMatrix::zeros(3, 3), ScanExtent::new(1.0, 1.0, 0.0, 2.0));
        assert_eq!(scan.steps().unwrap_err().kind(), ErrorKind::DegenerateInput);

        let scan = Scan2D::new(DMatrix::zeros(3, 5), ScanExtent::new(0.0, 2.0, 0.0, 1.0));
        let (sx, sy) = scan.steps().unwrap();
        assert!((sx - 0.5).abs() < 1e-12);
        assert!((sy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn derivative_mode_parses_labels() {
        for mode in [
            DerivativeMode::None,
            DerivativeMode::Dx,
            DerivativeMode::Dy,
            DerivativeMode::Dxy,
            DerivativeMode::XMinusY,
        ] {
            assert_eq!(mode.label().parse::<DerivativeMode>().unwrap(), mode);
        }
        assert!("dz".parse::<DerivativeMode>().is_err());
    }
}
