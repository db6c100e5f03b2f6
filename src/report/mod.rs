//! Plain-text summaries for terminal output.

pub mod format;

pub use format::*;
