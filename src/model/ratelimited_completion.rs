use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use tracing::{Instrument, debug_span, info_span};

use super::{CompletionModel, CompletionRequest, ModelError};

#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    async fn completion(&self, request: CompletionRequest) -> Result<String, ModelError> {
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        self.model
            .completion(request)
            .instrument(info_span!("completion"))
            .await
    }
}
