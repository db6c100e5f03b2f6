//! Cost, tax and margin derivation.
//!
//! - fixed per-m² bill of quantities (`materials`) priced from a catalog (`catalog`)
//! - tax regime (`tax`)
//! - the materials → labor → risk → tax → margin pipeline (`pipeline`)

pub mod catalog;
pub mod materials;
pub mod pipeline;
pub mod tax;

pub use catalog::*;
pub use materials::*;
pub use pipeline::*;
pub use tax::*;
