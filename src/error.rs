//! Error types.
//!
//! The library reports failures through [`QuoteError`]. The `quote` binary wraps
//! those in [`AppError`], which additionally carries the process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the classification and pricing engine.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Negative or non-finite numeric input to the pricing pipeline.
    #[error("invalid quote input: {0}")]
    InvalidQuoteInput(String),

    /// A model update was requested with no labelled samples.
    #[error("model update batch is empty")]
    EmptyBatch,

    /// An update sample had a tier index outside `0..=3` or a non-finite feature.
    #[error("invalid training sample at batch position {position}: {reason}")]
    InvalidSample { position: usize, reason: String },

    /// Persisted model artifacts exist but cannot be used.
    #[error("failed to load risk model from '{}': {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("failed to persist risk model to '{}': {reason}", path.display())]
    ModelSave { path: PathBuf, reason: String },

    /// Training data could not produce a scaler or forest.
    #[error("risk model training failed: {0}")]
    Training(String),

    /// An item-priced quote referenced a material missing from the catalog.
    #[error("material '{0}' not found in catalog")]
    UnknownMaterial(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl QuoteError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

pub type QuoteResult<T> = Result<T, QuoteError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        let exit_code = match &err {
            QuoteError::Config(_)
            | QuoteError::InvalidQuoteInput(_)
            | QuoteError::InvalidSample { .. }
            | QuoteError::EmptyBatch
            | QuoteError::UnknownMaterial(_) => 2,
            QuoteError::ModelLoad { .. } | QuoteError::ModelSave { .. } | QuoteError::Training(_) => 3,
            QuoteError::Io { .. } => 4,
        };
        Self::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_errors_map_to_exit_codes() {
        let err: AppError = QuoteError::EmptyBatch.into();
        assert_eq!(err.exit_code(), 2);

        let err: AppError = QuoteError::ModelLoad {
            path: PathBuf::from("models/risk_model.json"),
            reason: "truncated".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("risk_model.json"));

        let err: AppError = QuoteError::Training("no rows".to_string()).into();
        assert_eq!(err.exit_code(), 3);
    }
}
