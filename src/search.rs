//! # Search-and-Answer Module for RAG
//!
//! This module holds the retrieval and generation stages of the pipeline and
//! the orchestrator that sequences them for a single request.
//!
//! ## Key Components
//!
//! - `SimilaritySearchEngine`: Vector search over a `ChunkStore`, with a keyword fallback
//! - `ContextAssembler`: Joins retrieved chunk texts under a character budget
//! - `AnswerGenerator`: Builds the grounded system instruction and calls the completion model
//! - `SearchOrchestrator`: Validate, embed, search, assemble, generate, respond
//!
//! ## Failure Handling
//!
//! A failing vector query is recovered by the keyword fallback and never
//! reaches the caller. A blank query is a client error. Embedding and
//! generation failures end the request with a `SearchError`.

pub mod answer;
pub mod context;
pub mod engine;
mod error;
pub mod orchestrator;

pub use answer::{AnswerGenerator, build_system_prompt};
pub use context::{AssembledContext, CHUNK_DELIMITER, ContextAssembler, ContextItem};
pub use engine::{SimilaritySearchEngine, VectorOutcome, rank_matches};
pub use error::{QUERY_REQUIRED, SearchError};
pub use orchestrator::{SearchOrchestrator, SearchRequest, SearchResponse, Stage};
