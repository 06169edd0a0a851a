//! Error types for kbchat.
//!
//! A single error enum covers every subsystem: configuration, I/O, the
//! generation and search collaborators, prompt rendering and serialization.
//! None of these is session-fatal; the caller decides whether to keep going.

use thiserror::Error;

/// Unified error type for kbchat.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport or protocol errors from an LLM provider
    #[error("LLM error: {0}")]
    Llm(String),

    /// A turn's generation step failed; no answer was produced
    #[error("Generation failed: {0}")]
    Generation(String),

    /// The search collaborator failed or was unreachable
    #[error("Search unavailable: {0}")]
    Search(String),

    /// Local document index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

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
