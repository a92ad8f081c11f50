//! Parallel fitting over many independent inputs.
//!
//! Each fit is a pure function of its input, so the batch simply maps over a
//! rayon parallel iterator. Output order equals input order and every entry
//! matches what a sequential call would return.

use rayon::prelude::*;

use crate::domain::{
    AnticrossingFit, AnticrossingFitConfig, AnticrossingParameters, PolarizationFit, PolarizationFitConfig,
    PolarizationTrace, ProcessedImage,
};
use crate::error::AppError;
use crate::fit::anticrossing::fit;
use crate::fit::polarization::fit_polarization;

pub fn fit_polarization_batch(
    traces: &[PolarizationTrace],
    config: &PolarizationFitConfig,
) -> Vec<Result<PolarizationFit, AppError>> {
    traces
        .par_iter()
        .map(|trace| fit_polarization(trace, config))
        .collect()
}

/// Fit every image from the same starting point.
pub fn fit_anticrossing_batch(
    images: &[ProcessedImage],
    initial: &AnticrossingParameters,
    config: &AnticrossingFitConfig,
) -> Vec<Result<AnticrossingFit, AppError>> {
    images
        .par_iter()
        .map(|image| fit(initial, image, config))
        .collect()
}
