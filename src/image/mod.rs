//! Image preprocessing for charge-stability scans.
//!
//! Responsibilities:
//!
//! - denoise (and optionally differentiate) the raw scan
//! - straighten it onto a square grid of spacing `istep`
//! - rescale so intensities are comparable across measurements

pub mod preprocess;

pub use preprocess::*;
