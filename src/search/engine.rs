//! Similarity search with keyword fallback
//!
//! The engine asks the chunk store for the nearest chunks above the similarity
//! floor and re-checks the contract on what comes back: only scores strictly
//! above the threshold, most similar first, ties in storage order, at most
//! `limit` rows. A failing vector query is reported as a value, not an error,
//! so the caller decides whether to fall back.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::index::{ChunkStore, DbError, LexicalMatch, SimilarityMatch};

/// Result of the vector similarity query
#[derive(Debug)]
pub enum VectorOutcome {
    /// The query ran; possibly zero matches
    Matches(Vec<SimilarityMatch>),

    /// The query itself failed (missing index, malformed call, timeout)
    EngineError(DbError),
}

/// Vector similarity search over a chunk store
#[derive(Debug, Clone)]
pub struct SimilaritySearchEngine<S: ChunkStore> {
    store: S,
    threshold: f64,
    limit: usize,
    fallback_limit: usize,
    timeout: Duration,
}

impl<S: ChunkStore> SimilaritySearchEngine<S> {
    pub fn new(
        store: S,
        threshold: f64,
        limit: usize,
        fallback_limit: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            threshold,
            limit,
            fallback_limit,
            timeout,
        }
    }

    /// An engine using the configured threshold, limits and timeout
    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(
            store,
            config.match_threshold,
            config.match_count,
            config.fallback_limit,
            config.upstream_timeout,
        )
    }

    /// Nearest chunks to `query_vector` above the similarity threshold
    #[instrument(skip_all, fields(threshold = self.threshold, limit = self.limit))]
    pub async fn search(&self, query_vector: &[f32]) -> VectorOutcome {
        let query = self
            .store
            .match_chunks(query_vector, self.threshold, self.limit);

        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(rows)) => {
                let matches = rank_matches(rows, self.threshold, self.limit);
                debug!("Vector search kept {} matches", matches.len());
                VectorOutcome::Matches(matches)
            }
            Ok(Err(e)) => VectorOutcome::EngineError(e),
            Err(_) => VectorOutcome::EngineError(DbError::Timeout(self.timeout)),
        }
    }

    /// Keyword matches for `query`, at most the fallback limit.
    ///
    /// A failing keyword query yields no matches rather than an error.
    #[instrument(skip_all, fields(limit = self.fallback_limit))]
    pub async fn lexical_fallback(&self, query: &str) -> Vec<LexicalMatch> {
        let search = self.store.text_search(query, self.fallback_limit);

        match tokio::time::timeout(self.timeout, search).await {
            Ok(Ok(mut matches)) => {
                matches.truncate(self.fallback_limit);
                debug!("Keyword fallback found {} matches", matches.len());
                matches
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Keyword fallback failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Keyword fallback timed out after {:?}", self.timeout);
                Vec::new()
            }
        }
    }
}

/// Keep matches strictly above `threshold`, most similar first, at most `limit`.
///
/// The sort is stable, so equal scores keep the order the store returned them in.
pub fn rank_matches(
    mut matches: Vec<SimilarityMatch>,
    threshold: f64,
    limit: usize,
) -> Vec<SimilarityMatch> {
    matches.retain(|m| m.similarity > threshold);
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches.truncate(limit);
    matches
}
