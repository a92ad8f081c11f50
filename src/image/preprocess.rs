//! Scan cleaning, straightening and scaling.
//!
//! A scan is usually recorded with different step sizes along the two gate
//! axes. The geometric model assumes square pixels, so we resample the
//! smoothed scan onto a grid with spacing `target_step` on both axes. The
//! mapping is expressed as homogeneous 3×3 affine matrices:
//!
//! ```text
//! raw pixel (col, row, 1)    --A-->  physical (x, y, 1)
//! output pixel (col, row, 1) --S-->  physical (x, y, 1)
//! output -> raw              =  A⁻¹ S
//! ```

use nalgebra::{DMatrix, Matrix3, Vector3};

use crate::domain::{DerivativeMode, PreprocessConfig, ProcessedImage, Scan2D, ScanExtent};
use crate::error::AppError;
use crate::math::{bilinear_clamped, gaussian_filter2d, percentile};

/// Intensity the reference percentile is mapped to.
pub const REFERENCE_LEVEL: f64 = 100.0;

/// Percentile used as the intensity reference.
pub const REFERENCE_PERCENTILE: f64 = 99.0;

/// Largest straightened image, in pixels, that [`straighten`] will allocate.
pub const MAX_OUTPUT_PIXELS: f64 = 4096.0 * 4096.0;

/// Straightened image plus the transform that produced it.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub image: ProcessedImage,
    /// Maps output pixel `(col, row, 1)` to raw scan pixel `(col, row, 1)`.
    pub output_to_raw: Matrix3<f64>,
}

/// Denoise, straighten and scale a scan with the default smoothing scale.
pub fn preprocess(
    scan: &Scan2D,
    derivative: DerivativeMode,
    target_step: f64,
) -> Result<ProcessedImage, AppError> {
    let config = PreprocessConfig {
        derivative,
        target_step,
        ..PreprocessConfig::default()
    };
    Ok(preprocess_with(scan, &config)?.image)
}

/// Denoise, straighten and scale a scan.
pub fn preprocess_with(scan: &Scan2D, config: &PreprocessConfig) -> Result<Preprocessed, AppError> {
    config.validate()?;
    scan.steps()?;
    if scan.data.iter().any(|v| !v.is_finite()) {
        return Err(AppError::degenerate_input("Scan contains non-finite values."));
    }

    let cleaned = clean_scan(&scan.data, config.smoothing_sigma, config.derivative);
    let (straight, output_to_raw) = straighten(&cleaned, &scan.extent, config.target_step)?;
    let scaled = scale_to_reference(straight)?;

    tracing::debug!(
        derivative = config.derivative.label(),
        rows = scaled.nrows(),
        cols = scaled.ncols(),
        step = config.target_step,
        "preprocessed scan"
    );

    Ok(Preprocessed {
        image: ProcessedImage {
            data: scaled,
            step: config.target_step,
            origin: [scan.extent.x_min, scan.extent.y_min],
        },
        output_to_raw,
    })
}

/// Gaussian smoothing, optionally combined with a first derivative.
///
/// Derivatives are in raw pixel units; `Dxy` and `XMinusY` add/subtract the
/// two axis derivatives.
pub fn clean_scan(data: &DMatrix<f64>, sigma: f64, derivative: DerivativeMode) -> DMatrix<f64> {
    match derivative {
        DerivativeMode::None => gaussian_filter2d(data, sigma, 0, 0),
        DerivativeMode::Dx => gaussian_filter2d(data, sigma, 1, 0),
        DerivativeMode::Dy => gaussian_filter2d(data, sigma, 0, 1),
        DerivativeMode::Dxy => gaussian_filter2d(data, sigma, 1, 0) + gaussian_filter2d(data, sigma, 0, 1),
        DerivativeMode::XMinusY => {
            gaussian_filter2d(data, sigma, 1, 0) - gaussian_filter2d(data, sigma, 0, 1)
        }
    }
}

/// Affine map from raw pixel `(col, row)` to physical `(x, y)`.
pub fn pixel_to_physical(extent: &ScanExtent, rows: usize, cols: usize) -> Result<Matrix3<f64>, AppError> {
    if rows < 2 || cols < 2 {
        return Err(AppError::degenerate_input(format!(
            "Scan must have at least 2x2 samples, got {rows}x{cols}."
        )));
    }
    let sx = extent.span_x() / (cols - 1) as f64;
    let sy = extent.span_y() / (rows - 1) as f64;
    if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
        return Err(AppError::degenerate_input(format!(
            "Scan steps must be positive, got x={sx}, y={sy}."
        )));
    }
    Ok(Matrix3::new(
        sx, 0.0, extent.x_min, //
        0.0, sy, extent.y_min, //
        0.0, 0.0, 1.0,
    ))
}

/// Resample onto a square grid of spacing `step` covering the extent.
pub fn straighten(
    data: &DMatrix<f64>,
    extent: &ScanExtent,
    step: f64,
) -> Result<(DMatrix<f64>, Matrix3<f64>), AppError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(AppError::degenerate_input(format!(
            "Target step must be finite and > 0, got {step}."
        )));
    }
    let (rows, cols) = data.shape();
    let raw_to_physical = pixel_to_physical(extent, rows, cols)?;
    let physical_to_raw = raw_to_physical
        .try_inverse()
        .ok_or_else(|| AppError::degenerate_input("Scan pixel transform is singular."))?;
    let output_to_physical = Matrix3::new(
        step, 0.0, extent.x_min, //
        0.0, step, extent.y_min, //
        0.0, 0.0, 1.0,
    );
    let output_to_raw = physical_to_raw * output_to_physical;

    let (out_rows, out_cols) = output_shape(extent, step)?;

    let out = DMatrix::from_fn(out_rows, out_cols, |r, c| {
        let p = output_to_raw * Vector3::new(c as f64, r as f64, 1.0);
        bilinear_clamped(data, p[0] / p[2], p[1] / p[2])
    });
    Ok((out, output_to_raw))
}

fn output_shape(extent: &ScanExtent, step: f64) -> Result<(usize, usize), AppError> {
    let cols = grid_len(extent.span_x(), step);
    let rows = grid_len(extent.span_y(), step);
    if !(rows.is_finite() && cols.is_finite()) || rows * cols > MAX_OUTPUT_PIXELS {
        return Err(AppError::degenerate_input(format!(
            "Straightened image would be {rows}x{cols} pixels at step {step}; limit is {MAX_OUTPUT_PIXELS}."
        )));
    }
    Ok((rows as usize, cols as usize))
}

fn grid_len(span: f64, step: f64) -> f64 {
    // Tolerate spans that are an exact multiple of the step up to rounding.
    (span / step + 1e-9).floor() + 1.0
}

/// Scale so that the reference percentile maps to [`REFERENCE_LEVEL`].
pub fn scale_to_reference(data: DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
    let reference = percentile(data.as_slice(), REFERENCE_PERCENTILE);
    if !reference.is_finite() || reference == 0.0 {
        return Err(AppError::degenerate_input(format!(
            "Reference percentile of the image is {reference}; cannot scale."
        )));
    }
    Ok(data * (REFERENCE_LEVEL / reference))
}
