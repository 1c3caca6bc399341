//! # Search Error Types Module
//!
//! Errors the search-and-answer pipeline can surface to its caller.
//!
//! A failing vector query never appears here: the engine reports it as
//! `VectorOutcome::EngineError` and the orchestrator recovers through the
//! keyword fallback. Everything below is either the caller's fault
//! (`InvalidRequest`) or a provider failure that ends the request.

use thiserror::Error;

use crate::model::ModelError;

/// Message returned for a missing or blank query
pub const QUERY_REQUIRED: &str = "Query is required";

/// Errors that can occur during a search-and-answer request
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request was malformed or the query was missing/blank
    #[error("{0}")]
    InvalidRequest(String),

    /// The query could not be embedded
    #[error("Embedding error: {0}")]
    Embedding(#[source] ModelError),

    /// The answer could not be generated
    #[error("Generation error: {0}")]
    Generation(#[source] ModelError),
}

impl SearchError {
    /// Whether the caller caused the failure (400) rather than the service (500)
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::InvalidRequest(_))
    }
}
