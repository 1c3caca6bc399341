//! OpenAI-compatible HTTP provider
//!
//! This module provides the HTTP client for the `/embeddings` and
//! `/chat/completions` endpoints and the two model types built on it.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{CompletionModel, CompletionRequest, EmbeddingModel, ModelError};

/// HTTP client for an OpenAI-compatible API
#[derive(Clone)]
pub struct OpenAiClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests, without a trailing slash
    base_url: String,

    /// Bearer token
    api_key: String,
}

impl OpenAiClient {
    /// Create a new client; every request is bounded by `timeout`
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// An embedding model served by this client
    pub fn embedding_model(&self, model: &str, ndims: usize) -> OpenAiEmbeddingModel {
        OpenAiEmbeddingModel {
            client: self.clone(),
            model: model.to_string(),
            ndims,
        }
    }

    /// A completion model served by this client
    pub fn completion_model(&self, model: &str) -> OpenAiCompletionModel {
        OpenAiCompletionModel {
            client: self.clone(),
            model: model.to_string(),
        }
    }

    /// POST a JSON body and decode the JSON response
    #[instrument(skip(self, body), level = "debug")]
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ModelError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = format!("{}/{}", self.base_url, path);

        debug!("Sending POST request to {}", path);
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "request to {} failed", path);
                ModelError::Unavailable(format!("request to {} failed: {}", path, e))
            })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ModelError::Unavailable(format!("failed to read {} response: {}", path, e))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&response_text)
                .map(|e| e.error.message)
                .unwrap_or(response_text);
            error!("API error: {} - {}", status, detail);
            return Err(ModelError::Unavailable(format!(
                "{} returned {}: {}",
                path, status, detail
            )));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse response: {}", e);
            ModelError::MalformedResponse(format!("Failed to parse {} response: {}", path, e))
        })
    }
}

// Wire types

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Embedding model behind `POST /embeddings`
#[derive(Clone)]
pub struct OpenAiEmbeddingModel {
    client: OpenAiClient,
    model: String,
    ndims: usize,
}

impl EmbeddingModel for OpenAiEmbeddingModel {
    fn ndims(&self) -> usize {
        self.ndims
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbeddingResponse = self.client.post("embeddings", &request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                ModelError::MalformedResponse("embedding response contained no data".to_string())
            })?;

        if embedding.len() != self.ndims {
            return Err(ModelError::MalformedResponse(format!(
                "expected a {}-dimensional embedding, got {}",
                self.ndims,
                embedding.len()
            )));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

/// Completion model behind `POST /chat/completions`
#[derive(Clone)]
pub struct OpenAiCompletionModel {
    client: OpenAiClient,
    model: String,
}

impl CompletionModel for OpenAiCompletionModel {
    async fn completion(&self, request: CompletionRequest) -> Result<String, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.preamble,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let response: ChatResponse = self.client.post("chat/completions", &body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ModelError::MalformedResponse(
                    "completion response contained no message content".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn client_for(url: &str) -> OpenAiClient {
        OpenAiClient::new("sk-test", url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_embed_text_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "text-embedding-3-small",
                "input": "what did I learn about rust?"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#)
            .expect(1)
            .create_async()
            .await;

        let model = client_for(&server.url()).embedding_model("text-embedding-3-small", 3);
        let embedding = model
            .embed_text("what did I learn about rust?")
            .await
            .unwrap();

        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_text_non_success_is_unavailable() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached"}}"#)
            .create_async()
            .await;

        let model = client_for(&server.url()).embedding_model("text-embedding-3-small", 3);
        let result = model.embed_text("hello").await;

        match result {
            Err(ModelError::Unavailable(message)) => {
                assert!(message.contains("Rate limit reached"))
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_embed_text_missing_vector_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"object":"list"}"#)
            .create_async()
            .await;

        let model = client_for(&server.url()).embedding_model("text-embedding-3-small", 3);
        let result = model.embed_text("hello").await;
        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_embed_text_empty_data_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let model = client_for(&server.url()).embedding_model("text-embedding-3-small", 3);
        let result = model.embed_text("hello").await;
        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_embed_text_dimension_mismatch_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.1,0.2]}]}"#)
            .create_async()
            .await;

        let model = client_for(&server.url()).embedding_model("text-embedding-3-small", 1536);
        let result = model.embed_text("hello").await;
        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_unavailable() {
        let model = client_for("http://127.0.0.1:1").embedding_model("text-embedding-3-small", 3);
        let result = model.embed_text("hello").await;
        assert!(matches!(result, Err(ModelError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_completion_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be helpful"},
                    {"role": "user", "content": "what did I ask about sleep?"}
                ],
                "temperature": 0.7,
                "max_tokens": 1000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "You asked about naps."}}
                    ]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let model = client_for(&server.url()).completion_model("gpt-4o-mini");
        let answer = model
            .completion(CompletionRequest {
                preamble: "be helpful".to_string(),
                prompt: "what did I ask about sleep?".to_string(),
                temperature: 0.7,
                max_tokens: 1000,
            })
            .await
            .unwrap();

        assert_eq!(answer, "You asked about naps.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_completion_without_choices_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let model = client_for(&server.url()).completion_model("gpt-4o-mini");
        let result = model
            .completion(CompletionRequest {
                preamble: String::new(),
                prompt: "hi".to_string(),
                temperature: 0.7,
                max_tokens: 10,
            })
            .await;
        assert!(matches!(result, Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_completion_server_error_is_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let model = client_for(&server.url()).completion_model("gpt-4o-mini");
        let result = model
            .completion(CompletionRequest {
                preamble: String::new(),
                prompt: "hi".to_string(),
                temperature: 0.7,
                max_tokens: 10,
            })
            .await;

        match result {
            Err(ModelError::Unavailable(message)) => {
                assert!(message.contains("upstream exploded"))
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = client_for("https://api.openai.com/v1/");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
