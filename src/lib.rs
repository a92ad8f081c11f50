//! `qdot-fit`: feature fitting for quantum-dot charge-stability measurements.
//!
//! Two independent pipelines:
//!
//! - anticrossing: preprocess a 2D scan (`image`), then fit a five-line
//!   geometric model to it with a two-pass simplex (`fit::anticrossing`)
//! - polarization line: seed a two-level model from a 1D trace
//!   (`fit::guess`) and refine it (`fit::polarization`)
//!
//! The crate does no I/O and installs no logging subscriber; it only emits
//! `tracing` events. Every fit is a pure function of its inputs.

pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod image;
pub mod math;
pub mod models;
pub mod report;
