//! Chunk store module for RAG
//!
//! This module provides the persistence side of retrieval: the archived
//! conversation chunks, the rows the similarity and keyword queries return,
//! and the `ChunkStore` seam the search engine is generic over. `Database`
//! implements the seam on top of LibSQL's vector extension.

mod database;
pub mod error;
#[cfg(test)]
pub(crate) mod mock_store;
mod schema;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use database::Database;
pub use error::DbError;

/// A stored fragment of archived conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatChunk {
    /// Unique identifier of the chunk
    pub id: String,

    /// Owning user, if the chunk was imported for a specific user
    pub user_id: Option<String>,

    /// Text of the chunk, never empty
    pub text: String,

    /// Embedding of the chunk, absent until it has been embedded
    pub embedding: Option<Vec<f32>>,

    /// Free-text tags
    pub tags: Vec<String>,

    /// Start of the source conversation
    pub conv_start: Option<DateTime<Utc>>,

    /// End of the source conversation
    pub conv_end: Option<DateTime<Utc>>,
}

impl ChatChunk {
    /// A chunk with only text and an optional embedding set
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        embedding: Option<Vec<f32>>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: None,
            text: text.into(),
            embedding,
            tags: Vec::new(),
            conv_start: None,
            conv_end: None,
        }
    }
}

/// A chunk returned by the vector similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// ID of the chunk
    pub id: String,

    /// Text content of the chunk
    pub content: String,

    /// `1 - cosine_distance` between the chunk and the query vector
    pub similarity: f64,
}

/// A chunk returned by the keyword fallback query; rank-only, no score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalMatch {
    /// Text content of the chunk
    pub content: String,

    /// Tags of the chunk
    pub tags: Vec<String>,
}

/// Persistence service exposing the similarity and keyword queries
pub trait ChunkStore: Send + Sync {
    /// Chunks whose similarity to `query_embedding` is strictly greater than
    /// `threshold`, most similar first, at most `count` of them
    fn match_chunks(
        &self,
        query_embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> impl Future<Output = Result<Vec<SimilarityMatch>, DbError>> + Send;

    /// Chunks whose text contains any significant keyword of `query`, most
    /// keywords matched first, ties in storage order
    fn text_search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<LexicalMatch>, DbError>> + Send;
}
