//! Closed-form signal models.
//!
//! Models are implemented as small, pure functions so that the cost and
//! optimizer code can stay generic.

pub mod anticrossing;
pub mod polarization;

pub use anticrossing::*;
pub use polarization::*;
