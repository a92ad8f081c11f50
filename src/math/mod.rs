//! Numeric building blocks: filtering, sampling, order statistics and linear
//! least squares.

pub mod filter;
pub mod interp;
pub mod ols;
pub mod stats;

pub use filter::*;
pub use interp::*;
pub use ols::*;
pub use stats::*;
