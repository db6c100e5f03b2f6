//! File input/output helpers.
//!
//! - material catalog JSON read/write (`catalog`)
//! - labelled update batches (`batch`)
//! - quote exports (`export`)

pub mod batch;
pub mod catalog;
pub mod export;

pub use batch::*;
pub use catalog::*;
pub use export::*;
