//! # LLM Client Module
//!
//! This module provides a unified client interface for the embedding and
//! completion providers behind the search-and-answer pipeline, with built-in
//! rate limiting to prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `EmbeddingModel` / `CompletionModel`: The provider seams the pipeline is generic over
//! - `Client`: A unified client that wraps both completion and embedding models
//! - `OpenAiClient`: An OpenAI-compatible HTTP provider (`/embeddings`, `/chat/completions`)
//! - `RateLimitedCompletionModel` / `RateLimitedEmbeddingModel`: Quota wrappers
//! - `EmbeddingConversion`: Utilities for converting vectors to storage blobs
//!
//! Provider responses are decoded into explicit types on receipt. A response
//! that is missing the expected field is a `ModelError::MalformedResponse`, an
//! unreachable provider or non-success status is a `ModelError::Unavailable`.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};

use crate::config::Config;

pub mod embedding;
pub mod error;
#[cfg(test)]
pub(crate) mod mock_model;
pub mod openai;
pub mod ratelimited_completion;
pub mod ratelimited_embedding;

pub use embedding::EmbeddingConversion;
pub use error::ModelError;
pub use openai::{OpenAiClient, OpenAiCompletionModel, OpenAiEmbeddingModel};
pub use ratelimited_completion::RateLimitedCompletionModel;
pub use ratelimited_embedding::RateLimitedEmbeddingModel;

/// A provider that turns text into a dense vector of fixed dimensionality.
pub trait EmbeddingModel: Send + Sync {
    /// Dimensionality of the vectors this model produces
    fn ndims(&self) -> usize;

    /// Embed a single text
    fn embed_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<f32>, ModelError>> + Send;
}

/// A provider that generates one answer for a system instruction and a user prompt.
pub trait CompletionModel: Send + Sync {
    /// Run a single two-message completion and return the generated text
    fn completion(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<String, ModelError>> + Send;
}

/// A single-turn completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// System instruction
    pub preamble: String,

    /// User message
    pub prompt: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Output token cap
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    completion_model: C,
    embedding_model: E,
}

impl
    Client<
        RateLimitedCompletionModel<OpenAiCompletionModel>,
        RateLimitedEmbeddingModel<OpenAiEmbeddingModel>,
    >
{
    /// Build rate-limited OpenAI-compatible models from the configuration
    pub fn new_openai(config: &Config) -> Result<Self, ModelError> {
        let api_key = config
            .require_api_key()
            .map_err(|e| ModelError::Config(e.to_string()))?;
        let openai = OpenAiClient::new(api_key, &config.api_base_url, config.upstream_timeout)?;

        let completion_limiter =
            RateLimiter::direct(Quota::per_minute(non_zero(config.completion_rate_per_minute)?));
        let embedding_limiter =
            RateLimiter::direct(Quota::per_minute(non_zero(config.embedding_rate_per_minute)?));

        let completion_model = RateLimitedCompletionModel::new(
            openai.completion_model(&config.completion_model),
            completion_limiter,
        );
        let embedding_model = RateLimitedEmbeddingModel::new(
            openai.embedding_model(&config.embedding_model, config.embedding_dimensions),
            embedding_limiter,
        );
        Ok(Self {
            completion_model,
            embedding_model,
        })
    }
}

fn non_zero(per_minute: u32) -> Result<NonZeroU32, ModelError> {
    NonZeroU32::new(per_minute)
        .ok_or_else(|| ModelError::Config("rate limit must be positive".to_string()))
}

impl<C, E> Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    pub fn new(completion_model: C, embedding_model: E) -> Self {
        Self {
            completion_model,
            embedding_model,
        }
    }

    /// Split the client into its completion and embedding models
    pub fn into_parts(self) -> (C, E) {
        (self.completion_model, self.embedding_model)
    }
}
