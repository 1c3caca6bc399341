//! # Database Error Types Module
//!
//! Error types for the chunk store. Any of these raised by the vector
//! similarity query counts as a search engine failure and is recovered by the
//! keyword fallback; raised anywhere else they propagate to the caller.

use thiserror::Error;

/// Error type for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store did not answer in time
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
}
