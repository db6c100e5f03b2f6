//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - project inputs (`ProjectAttributes`, `Complexity`, `Environment`, `ProjectRequest`)
//! - classifier inputs/outputs (`FeatureVector`, `RiskTier`, `RiskResult`, `LabeledSample`)
//! - pricing outputs (`QuoteBreakdown`, `MaterialLineItem`, `TaxAssessment`, `ProjectQuote`)

pub mod types;

pub use types::*;
