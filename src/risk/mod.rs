//! Risk classification.
//!
//! Responsibilities:
//!
//! - map project attributes to a feature vector (`features`)
//! - deterministic threshold rules (`rules`)
//! - blend rule and statistical results into one tier/multiplier (`combine`)
//!
//! The statistical side lives in [`crate::model`].

pub mod combine;
pub mod features;
pub mod rules;

pub use combine::*;
pub use features::*;
pub use rules::*;
