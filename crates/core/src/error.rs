//! Error types for the nameforge CLI.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, chunk format, LLM, persistence,
//! and serialization errors.

use thiserror::Error;

/// Unified error type for the nameforge CLI.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration and startup errors (missing credential, bad paths).
    /// These are fatal: the process exits non-zero without doing any work.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A chunk file matches neither tolerated shape (bare array or
    /// `{names: [...]}`). Fatal for that chunk only; the run continues.
    #[error("Chunk format error: {0}")]
    Format(String),

    /// Text-generation API errors (network, rate limit, malformed response,
    /// cardinality mismatch). Recovered via retry-with-backoff.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Write failure for a chunk file or the checkpoint. Fatal to the run:
    /// we cannot safely continue without durable state.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
