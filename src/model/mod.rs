//! Statistical risk classifier.
//!
//! - synthetic, rule-consistent training data for cold start (`bootstrap`)
//! - random forest over the scaled feature triple (`forest`)
//! - persisted scaler + forest artifacts (`store`)
//! - the classifier with its load / bootstrap / update lifecycle (`statistical`)

pub mod bootstrap;
pub mod forest;
pub mod statistical;
pub mod store;

pub use statistical::*;
pub use store::{FileModelStore, MemoryModelStore, ModelStore, ModelTxn};
