//! # Search Orchestrator
//!
//! Sequences one search-and-answer request:
//!
//! 1. Validate the query (blank queries never reach a provider)
//! 2. Embed the query
//! 3. Run the vector search, or the keyword fallback if the vector query fails
//! 4. Assemble the retrieved chunks into a context block
//! 5. Generate the answer and report how many chunks it was grounded in
//!
//! An embedding failure ends the request; it does not trigger the keyword path.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{Span, error, info, instrument, warn};

use super::answer::AnswerGenerator;
use super::context::{AssembledContext, ContextAssembler, ContextItem};
use super::engine::{SimilaritySearchEngine, VectorOutcome};
use super::error::{QUERY_REQUIRED, SearchError};
use crate::config::Config;
use crate::index::ChunkStore;
use crate::model::{Client, CompletionModel, EmbeddingModel};

/// Inbound request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }

    /// The query, if present and not blank
    pub fn validated_query(&self) -> Result<&str, SearchError> {
        match self.query.as_deref() {
            Some(q) if !q.trim().is_empty() => Ok(q),
            _ => Err(SearchError::InvalidRequest(QUERY_REQUIRED.to_string())),
        }
    }
}

/// Successful response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Generated answer
    pub response: String,

    /// Number of chunks placed into the prompt under the context budget.
    /// Can be lower than the number of matches retrieved.
    pub context_found: usize,
}

/// Where a request currently is, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidatingInput,
    Embedding,
    Searching,
    SearchFallback,
    AssemblingContext,
    Generating,
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ValidatingInput => "validating_input",
            Stage::Embedding => "embedding",
            Stage::Searching => "searching",
            Stage::SearchFallback => "search_fallback",
            Stage::AssemblingContext => "assembling_context",
            Stage::Generating => "generating",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// The request handler behind `/chat-search` and `memex ask`.
///
/// Built once per process and shared read-only across requests.
pub struct SearchOrchestrator<C, E, S>
where
    C: CompletionModel,
    E: EmbeddingModel,
    S: ChunkStore,
{
    embedder: E,
    engine: SimilaritySearchEngine<S>,
    assembler: ContextAssembler,
    generator: AnswerGenerator<C>,
}

impl<C, E, S> SearchOrchestrator<C, E, S>
where
    C: CompletionModel,
    E: EmbeddingModel,
    S: ChunkStore,
{
    pub fn new(client: Client<C, E>, store: S, config: &Config) -> Self {
        let (completion, embedder) = client.into_parts();
        Self {
            embedder,
            engine: SimilaritySearchEngine::from_config(store, config),
            assembler: ContextAssembler::new(config.max_context_chars),
            generator: AnswerGenerator::from_config(completion, config),
        }
    }

    /// Answer a bare query string
    pub async fn ask(&self, query: &str) -> Result<SearchResponse, SearchError> {
        self.handle(SearchRequest::new(query)).await
    }

    /// Run one request through every stage
    #[instrument(skip_all, fields(query_len = tracing::field::Empty))]
    pub async fn handle(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let query = request.validated_query().inspect_err(|_| {
            warn!(stage = %Stage::ValidatingInput, "Rejected request without a query");
        })?;
        Span::current().record("query_len", query.len());

        info!(stage = %Stage::Embedding, "Embedding query");
        let vector = self.embedder.embed_text(query).await.map_err(|e| {
            error!(stage = %Stage::Embedding, error = %e, "Failed to embed query");
            SearchError::Embedding(e)
        })?;

        info!(stage = %Stage::Searching, "Running similarity search");
        let context = match self.engine.search(&vector).await {
            VectorOutcome::Matches(matches) => {
                info!(stage = %Stage::Searching, "Found {} similar chunks", matches.len());
                self.assemble(&matches)
            }
            VectorOutcome::EngineError(e) => {
                warn!(
                    stage = %Stage::SearchFallback,
                    error = %e,
                    "Vector search failed, falling back to keyword search"
                );
                let matches = self.engine.lexical_fallback(query).await;
                info!(
                    stage = %Stage::SearchFallback,
                    "Keyword search found {} chunks",
                    matches.len()
                );
                self.assemble(&matches)
            }
        };

        info!(stage = %Stage::Generating, context_found = context.count, "Generating answer");
        let response = self
            .generator
            .generate(query, &context.text)
            .await
            .map_err(|e| {
                error!(stage = %Stage::Generating, error = %e, "Failed to generate answer");
                SearchError::Generation(e)
            })?;

        info!(stage = %Stage::Responding, context_found = context.count, "Answer ready");
        Ok(SearchResponse {
            response,
            context_found: context.count,
        })
    }

    fn assemble<T: ContextItem>(&self, items: &[T]) -> AssembledContext {
        let context = self.assembler.assemble(items);
        if context.count < items.len() {
            info!(
                stage = %Stage::AssemblingContext,
                "Context budget kept {} of {} chunks",
                context.count,
                items.len()
            );
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::index::mock_store::MockChunkStore;
    use crate::model::ModelError;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};
    use crate::search::answer::build_system_prompt;

    struct Harness {
        embedder: MockEmbeddingModel,
        completion: MockCompletionModel,
        store: MockChunkStore,
        orchestrator: SearchOrchestrator<MockCompletionModel, MockEmbeddingModel, MockChunkStore>,
    }

    async fn harness(embedder: MockEmbeddingModel, store: MockChunkStore) -> Harness {
        let config = Config::builder()
            .upstream_timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        harness_with(embedder, store, &config).await
    }

    async fn harness_with(
        embedder: MockEmbeddingModel,
        store: MockChunkStore,
        config: &Config,
    ) -> Harness {
        let completion = MockCompletionModel::new();
        completion.set_text_response("Here is what I found.").await;
        let orchestrator = SearchOrchestrator::new(
            Client::new(completion.clone(), embedder.clone()),
            store.clone(),
            config,
        );
        Harness {
            embedder,
            completion,
            store,
            orchestrator,
        }
    }

    fn embedder() -> MockEmbeddingModel {
        MockEmbeddingModel::returning(vec![0.1, 0.2, 0.3])
    }

    #[test]
    fn test_validated_query() {
        assert_eq!(SearchRequest::new("hi").validated_query().unwrap(), "hi");
        assert!(SearchRequest::new("   \n\t").validated_query().is_err());
        assert!(SearchRequest::default().validated_query().is_err());
    }

    #[test]
    fn test_response_uses_camel_case() {
        let json = serde_json::to_value(SearchResponse {
            response: "ok".to_string(),
            context_found: 2,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"response": "ok", "contextFound": 2}));
    }

    #[tokio::test]
    async fn test_blank_query_makes_no_upstream_calls() {
        let h = harness(embedder(), MockChunkStore::new()).await;

        for request in [SearchRequest::new("   "), SearchRequest::default()] {
            let err = h.orchestrator.handle(request).await.unwrap_err();
            assert!(err.is_client_error());
            assert_eq!(err.to_string(), QUERY_REQUIRED);
        }

        assert_eq!(h.embedder.calls(), 0);
        assert_eq!(h.store.match_calls(), 0);
        assert_eq!(h.store.text_calls(), 0);
        assert!(h.completion.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_vector_matches_become_context() {
        let store = MockChunkStore::new().with_matches(&[
            ("c3", "third", 0.72),
            ("c1", "first", 0.9),
            ("c4", "excluded", 0.65),
            ("c2", "second", 0.85),
        ]);
        let h = harness(embedder(), store).await;

        let response = h.orchestrator.ask("what did I ask about bread?").await.unwrap();

        assert_eq!(response.context_found, 3);
        assert_eq!(response.response, "Here is what I found.");
        assert_eq!(h.store.text_calls(), 0);

        let requests = h.completion.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "what did I ask about bread?");
        assert_eq!(
            requests[0].preamble,
            build_system_prompt("first\n\nsecond\n\nthird")
        );
    }

    #[tokio::test]
    async fn test_context_found_counts_chunks_within_budget() {
        let store = MockChunkStore::new().with_matches(&[
            ("c1", "first", 0.9),
            ("c2", "second", 0.85),
            ("c3", "third", 0.8),
        ]);
        let config = Config::builder()
            .upstream_timeout(Duration::from_secs(5))
            .max_context_chars(Some(13))
            .build()
            .unwrap();
        let h = harness_with(embedder(), store, &config).await;

        let response = h.orchestrator.ask("what did I ask about bread?").await.unwrap();

        assert_eq!(response.context_found, 2);
        let requests = h.completion.requests().await;
        assert_eq!(requests[0].preamble, build_system_prompt("first\n\nsecond"));
    }

    #[tokio::test]
    async fn test_engine_error_falls_back_to_keywords() {
        let store = MockChunkStore::new()
            .failing_vector("no such function: vector_top_k")
            .with_lexical(&["bread notes", "starter notes"]);
        let h = harness(embedder(), store).await;

        let response = h.orchestrator.ask("bread").await.unwrap();

        assert_eq!(response.context_found, 2);
        assert_eq!(h.store.text_args(), vec![("bread".to_string(), 3)]);
        let requests = h.completion.requests().await;
        assert_eq!(
            requests[0].preamble,
            build_system_prompt("bread notes\n\nstarter notes")
        );
    }

    #[tokio::test]
    async fn test_no_matches_on_either_path_still_answers() {
        let store = MockChunkStore::new().failing_vector("index missing");
        let h = harness(embedder(), store).await;

        let response = h.orchestrator.ask("anything").await.unwrap();

        assert_eq!(response.context_found, 0);
        let requests = h.completion.requests().await;
        assert_eq!(requests[0].preamble, build_system_prompt(""));
    }

    #[tokio::test]
    async fn test_zero_vector_matches_skips_fallback() {
        let store = MockChunkStore::new()
            .with_matches(&[("c1", "weak", 0.4)])
            .with_lexical(&["never used"]);
        let h = harness(embedder(), store).await;

        let response = h.orchestrator.ask("anything").await.unwrap();

        assert_eq!(response.context_found, 0);
        assert_eq!(h.store.text_calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_is_an_error() {
        let store = MockChunkStore::new().with_matches(&[("c1", "first", 0.9)]);
        let h = harness(embedder(), store).await;
        h.completion.set_failure("502 Bad Gateway").await;

        let err = h.orchestrator.ask("q").await.unwrap_err();

        assert!(!err.is_client_error());
        assert!(matches!(err, SearchError::Generation(ModelError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_search() {
        let store = MockChunkStore::new().with_lexical(&["would have matched"]);
        let h = harness(MockEmbeddingModel::failing("connection refused"), store).await;

        let err = h.orchestrator.ask("q").await.unwrap_err();

        assert!(matches!(err, SearchError::Embedding(_)));
        assert_eq!(h.embedder.calls(), 1);
        assert_eq!(h.store.match_calls(), 0);
        assert_eq!(h.store.text_calls(), 0);
        assert!(h.completion.requests().await.is_empty());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::SearchFallback.to_string(), "search_fallback");
        assert_eq!(Stage::ValidatingInput.to_string(), "validating_input");
    }
}
