//! Fitting pipelines.
//!
//! - `simplex`: the shared Nelder–Mead minimizer
//! - `cost` + `anticrossing`: two-pass fit of the 2D anticrossing model
//! - `guess` + `polarization`: seeded fit of the 1D polarization line
//! - `batch`: parallel fan-out over many inputs

pub mod anticrossing;
pub mod batch;
pub mod cost;
pub mod guess;
pub mod polarization;
pub mod simplex;

pub use anticrossing::{default_initial_guess, fit_anticrossing};
pub use batch::*;
pub use cost::{CostDiagnostics, evaluate, residual_term};
pub use guess::{MIN_TRACE_LEN, guess, guess_with};
pub use polarization::{fit_polarization, residual_norm};
pub use simplex::{SimplexResult, minimize};
