//! Domain types used throughout the fitting pipelines.
//!
//! This module defines:
//!
//! - measurement inputs (`Scan2D`, `PolarizationTrace`)
//! - derived data (`ProcessedImage`)
//! - parameter vectors and fit outputs for both pipelines
//! - configuration structs with calibrated defaults (`config`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
