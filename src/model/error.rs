//! Error types for the model module

use thiserror::Error;

/// Error type for embedding and completion provider calls
#[derive(Debug, Error)]
pub enum ModelError {
    /// Provider unreachable, timed out, or answered with a non-success status
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Provider answered but the body lacks the expected shape
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Client could not be constructed
    #[error("Provider configuration error: {0}")]
    Config(String),
}
