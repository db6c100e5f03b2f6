//! Numeric utilities: feature standardization.

pub mod scaler;

pub use scaler::*;
