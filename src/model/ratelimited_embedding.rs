use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use tracing::{Instrument, debug_span, info_span};

use super::{EmbeddingModel, ModelError};

#[derive(Clone)]
pub struct RateLimitedEmbeddingModel<M: EmbeddingModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedEmbeddingModel<M>
where
    M: EmbeddingModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: EmbeddingModel> EmbeddingModel for RateLimitedEmbeddingModel<M> {
    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        self.model
            .embed_text(text)
            .instrument(info_span!("embed_text"))
            .await
    }
}
