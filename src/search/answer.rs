//! Grounded answer generation

use tracing::{debug, instrument};

use crate::config::Config;
use crate::model::{CompletionModel, CompletionRequest, ModelError};

const ROLE: &str = "You are an assistant that helps users explore and understand their \
archived chat-assistant conversation history.";

const NO_CONTEXT: &str = "No relevant context was found in the user's previous conversations.";

const CLOSING: &str = "Respond naturally and helpfully. If you found relevant context, \
reference it specifically. If not, let the user know you couldn't find related conversations.";

/// Build the system instruction for a query, embedding `context` verbatim when present
pub fn build_system_prompt(context: &str) -> String {
    let body = if context.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        format!(
            "Here is relevant context from the user's previous conversations:\n\n\
             {context}\n\n\
             Ground your answer in this context. Use it to answer questions, offer insights, \
             or point out patterns in the past conversations, and cite specific details \
             from it when relevant."
        )
    };

    format!("{ROLE}\n\n{body}\n\n{CLOSING}")
}

/// Sends the system instruction and the user's query to a completion model
#[derive(Debug, Clone)]
pub struct AnswerGenerator<C: CompletionModel> {
    model: C,
    temperature: f64,
    max_tokens: u32,
}

impl<C: CompletionModel> AnswerGenerator<C> {
    pub fn new(model: C, temperature: f64, max_tokens: u32) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(model: C, config: &Config) -> Self {
        Self::new(model, config.temperature, config.max_tokens)
    }

    /// Generate one answer to `query` grounded in `context`
    #[instrument(skip_all, fields(context_len = context.len()))]
    pub async fn generate(&self, query: &str, context: &str) -> Result<String, ModelError> {
        let request = CompletionRequest {
            preamble: build_system_prompt(context),
            prompt: query.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let answer = self.model.completion(request).await?;
        debug!("Generated answer of length {}", answer.len());
        Ok(answer)
    }
}
