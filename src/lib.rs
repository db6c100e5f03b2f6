//! `forge-quote` library crate.
//!
//! Risk classification and price derivation for metalwork projects. The
//! binary (`quote`) is a thin wrapper around this library so that:
//!
//! - the classifiers and the pricing pipeline are testable without spawning processes
//! - other front-ends can embed [`app::QuoteEngine`] directly

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod model;
pub mod pricing;
pub mod report;
pub mod risk;
