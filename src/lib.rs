//! # memex - Semantic Search over Archived Assistant Conversations
//!
//! This crate answers natural-language questions about a user's archived
//! chat-assistant conversations with Retrieval-Augmented Generation: the
//! query is embedded, similar conversation chunks are retrieved from a
//! LibSQL vector index, and a completion model writes an answer grounded in
//! what was found.
//!
//! ## Features
//!
//! - OpenAI-compatible embedding and completion clients with rate limiting
//! - Vector similarity search with a similarity floor and a keyword fallback
//!   when the vector query fails
//! - Context assembly under a character budget
//! - A stateless HTTP service (`POST /chat-search`) and a CLI
//! - Async API with Tokio and structured logging with `tracing`
//!
//! ## Example
//!
//! ```rust,no_run
//! use memex::config::Config;
//! use memex::index::Database;
//! use memex::model::Client;
//! use memex::search::SearchOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::builder()
//!         .api_key("your-api-key")
//!         .database_path("memex.db")
//!         .build()?;
//!
//!     let store =
//!         Database::new_from_path(&config.database_path, config.embedding_dimensions).await?;
//!     let client = Client::new_openai(&config)?;
//!     let orchestrator = SearchOrchestrator::new(client, store, &config);
//!
//!     let answer = orchestrator.ask("What did I learn about sourdough?").await?;
//!     println!("{} (from {} chunks)", answer.response, answer.context_found);
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
pub mod index;
pub mod model;
pub mod search;
pub mod server;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::search::{SearchOrchestrator, SearchRequest, SearchResponse};
}
