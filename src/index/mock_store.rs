//! In-memory `ChunkStore` for pipeline tests. Counts calls, can be told to
//! fail or stall the vector query, and records the arguments it received.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ChunkStore, DbError, LexicalMatch, SimilarityMatch};

#[derive(Debug, Clone, Default)]
pub struct MockChunkStore {
    matches: Vec<SimilarityMatch>,
    lexical: Vec<LexicalMatch>,
    vector_failure: Option<String>,
    lexical_failure: Option<String>,
    vector_delay: Option<Duration>,
    match_calls: Arc<AtomicUsize>,
    text_calls: Arc<AtomicUsize>,
    match_args: Arc<Mutex<Vec<(f64, usize)>>>,
    text_args: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows the vector query returns, as-is
    pub fn with_matches(mut self, scored: &[(&str, &str, f64)]) -> Self {
        self.matches = scored
            .iter()
            .map(|(id, content, similarity)| SimilarityMatch {
                id: id.to_string(),
                content: content.to_string(),
                similarity: *similarity,
            })
            .collect();
        self
    }

    /// Rows the keyword query returns, as-is
    pub fn with_lexical(mut self, contents: &[&str]) -> Self {
        self.lexical = contents
            .iter()
            .map(|content| LexicalMatch {
                content: content.to_string(),
                tags: vec!["chatgpt_export".to_string()],
            })
            .collect();
        self
    }

    /// Make the vector query fail, e.g. a missing index
    pub fn failing_vector(mut self, message: &str) -> Self {
        self.vector_failure = Some(message.to_string());
        self
    }

    /// Make the keyword query fail
    pub fn failing_lexical(mut self, message: &str) -> Self {
        self.lexical_failure = Some(message.to_string());
        self
    }

    /// Stall the vector query before answering
    pub fn stalling_vector(mut self, delay: Duration) -> Self {
        self.vector_delay = Some(delay);
        self
    }

    pub fn match_calls(&self) -> usize {
        self.match_calls.load(Ordering::SeqCst)
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    /// `(threshold, count)` of every vector query
    pub fn match_args(&self) -> Vec<(f64, usize)> {
        self.match_args.lock().unwrap().clone()
    }

    /// `(query, limit)` of every keyword query
    pub fn text_args(&self) -> Vec<(String, usize)> {
        self.text_args.lock().unwrap().clone()
    }
}

impl ChunkStore for MockChunkStore {
    async fn match_chunks(
        &self,
        _query_embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> Result<Vec<SimilarityMatch>, DbError> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        self.match_args.lock().unwrap().push((threshold, count));
        if let Some(delay) = self.vector_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.vector_failure {
            Some(message) => Err(DbError::Query(message.clone())),
            None => Ok(self.matches.clone()),
        }
    }

    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<LexicalMatch>, DbError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text_args
            .lock()
            .unwrap()
            .push((query.to_string(), limit));
        match &self.lexical_failure {
            Some(message) => Err(DbError::Query(message.clone())),
            None => Ok(self.lexical.iter().take(limit).cloned().collect()),
        }
    }
}
