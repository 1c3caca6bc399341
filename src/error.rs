//! Error types for the memex crate

use thiserror::Error;

use crate::index::DbError;
use crate::model::ModelError;
use crate::search::SearchError;

/// Result type for memex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for memex operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding or completion provider error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Chunk store error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Search-and-answer pipeline error
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// I/O error (binding sockets, log directories)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
