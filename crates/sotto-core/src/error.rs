//! Error types for sotto.

use thiserror::Error;

/// Result type alias using sotto's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for sotto operations.
///
/// Fatality is decided by the caller, not the variant: `Store` failures are
/// swallowed (logged) by the pipeline and chat manager, `Search` failures
/// degrade hybrid search to local-only results, while `Transcription`,
/// `Analysis` and `Embedding` abort the pipeline run that raised them.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any network call was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or rejected credential on a protected endpoint
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transcription provider failed or timed out
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Analysis failed after the orchestrator and direct provider tiers
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Chat completion failed after the orchestrator and direct provider tiers
    #[error("Completion error: {0}")]
    Completion(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Remote persistence operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Remote vector search failed
    #[error("Search error: {0}")]
    Search(String),

    /// A conflicting run for the same resource is already in flight
    #[error("Busy: {0}")]
    Busy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
