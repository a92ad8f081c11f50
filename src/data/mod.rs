//! Data sources that do not come from an instrument.

pub mod synthetic;

pub use synthetic::*;
