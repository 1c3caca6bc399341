//! # Database Schema Module
//!
//! Creates the local chunk table and its vector index.
//!
//! ## Schema Design
//!
//! `chat_history` stores one row per conversation chunk. The `embedding`
//! column is an `F32_BLOB` of the configured dimensionality and may be NULL
//! for chunks that were never embedded. `tags` holds a JSON array and the
//! conversation bounds are RFC 3339 strings.
//!
//! The cosine vector index backs the similarity query. If it cannot be created
//! the store still opens; the similarity query then fails and the keyword
//! fallback takes over.

use libsql::{Connection, params};
use tracing::warn;

use crate::index::error::DbError;

/// Name of the vector index queried by `vector_top_k`
pub const VECTOR_INDEX: &str = "chat_history_embedding_idx";

/// Initialize the database schema
pub async fn initialize_schema(conn: &Connection, dimensions: usize) -> Result<(), DbError> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS chat_history (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                chunk_text TEXT NOT NULL CHECK (length(chunk_text) > 0),
                embedding F32_BLOB({dimensions}),
                tags TEXT NOT NULL DEFAULT '[]',
                conv_start TEXT,
                conv_end TEXT
            )"
        ),
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create chat_history table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chat_history_user_id ON chat_history(user_id)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on user_id: {}", e)))?;

    let vector_index_result = conn
        .execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {VECTOR_INDEX} \
                 ON chat_history (libsql_vector_idx(embedding, 'metric=cosine'))"
            ),
            params![],
        )
        .await;

    if let Err(e) = vector_index_result {
        warn!(
            "Failed to create vector index: {}. Searches will use keyword matching.",
            e
        );
    }

    Ok(())
}
