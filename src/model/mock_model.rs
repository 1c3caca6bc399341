//! # Mock Models for Testing
//!
//! Provides `MockEmbeddingModel` and `MockCompletionModel`, which implement the
//! provider traits for use in tests. They return a predefined response or
//! error and record how often (and with what) they were called, so tests can
//! assert that a stage was or was not reached.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Mutex;

use super::{CompletionModel, CompletionRequest, EmbeddingModel, ModelError};

/// A mock embedding model returning a fixed vector, or failing.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    vector: Vec<f32>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbeddingModel {
    /// A model that embeds every text as `vector`.
    pub fn returning(vector: Vec<f32>) -> Self {
        Self {
            vector,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A model whose provider is unreachable.
    pub fn failing(message: &str) -> Self {
        Self {
            vector: vec![0.0; 3],
            failure: Some(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `embed_text` calls so far, across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    fn ndims(&self) -> usize {
        self.vector.len()
    }

    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(ModelError::Unavailable(message.clone())),
            None => Ok(self.vector.clone()),
        }
    }
}

/// A mock completion model.
/// It returns a predefined response or error when `completion` is called.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    response: Arc<Mutex<Option<Result<String, String>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return an empty success response.
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the text the mock model should return.
    pub async fn set_text_response(&self, text: &str) {
        *self.response.lock().await = Some(Ok(text.to_string()));
    }

    /// Makes every subsequent call fail as if the provider were down.
    pub async fn set_failure(&self, message: &str) {
        *self.response.lock().await = Some(Err(message.to_string()));
    }

    /// Requests received so far, in order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    async fn completion(&self, request: CompletionRequest) -> Result<String, ModelError> {
        self.requests.lock().await.push(request);
        let response = self.response.lock().await.clone();
        match response {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(ModelError::Unavailable(message)),
            None => Ok(String::new()),
        }
    }
}
