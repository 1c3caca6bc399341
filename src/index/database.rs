//! Database operations for the index module

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Row, Rows, Value, params};
use tracing::{debug, instrument};

use crate::index::error::DbError;
use crate::index::schema::{self, VECTOR_INDEX};
use crate::index::{ChatChunk, ChunkStore, LexicalMatch, SimilarityMatch};
use crate::model::embedding::EmbeddingConversion;

/// Chunk store backed by a LibSQL database
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    dimensions: usize,
}

impl Database {
    /// Create a new chunk store on an open connection
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection, dimensions: usize) -> Result<Self, DbError> {
        schema::initialize_schema(&conn, dimensions).await?;

        Ok(Self { conn, dimensions })
    }

    /// Open (or create) a local chunk store at `path`
    pub async fn new_from_path(path: impl AsRef<Path>, dimensions: usize) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path.as_ref())
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn, dimensions).await
    }

    /// Dimensionality of stored embeddings
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    /// Insert or replace a chunk
    pub async fn add_chunk(&self, chunk: &ChatChunk) -> Result<(), DbError> {
        if chunk.text.trim().is_empty() {
            return Err(DbError::Data(format!("Chunk {} has no text", chunk.id)));
        }

        let embedding = match &chunk.embedding {
            Some(vector) if vector.len() != self.dimensions => {
                return Err(DbError::Data(format!(
                    "Chunk {} has a {}-dimensional embedding, expected {}",
                    chunk.id,
                    vector.len(),
                    self.dimensions
                )));
            }
            Some(vector) => Value::Blob(vector.to_binary()),
            None => Value::Null,
        };

        let tags = serde_json::to_string(&chunk.tags)
            .map_err(|e| DbError::Data(format!("Failed to encode tags: {}", e)))?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO chat_history
                    (id, user_id, chunk_text, embedding, tags, conv_start, conv_end)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                vec![
                    Value::Text(chunk.id.clone()),
                    optional_text(chunk.user_id.clone()),
                    Value::Text(chunk.text.clone()),
                    embedding,
                    Value::Text(tags),
                    optional_text(chunk.conv_start.map(|t| t.to_rfc3339())),
                    optional_text(chunk.conv_end.map(|t| t.to_rfc3339())),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to add chunk: {}", e)))?;

        Ok(())
    }

    /// Get a chunk by ID
    pub async fn get_chunk(&self, id: &str) -> Result<Option<ChatChunk>, DbError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, user_id, chunk_text, embedding, tags, conv_start, conv_end
                 FROM chat_history
                 WHERE id = ?",
                params![id],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to get chunk: {}", e)))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_chunk(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete a chunk by ID, returning whether it existed
    pub async fn delete_chunk(&self, id: &str) -> Result<bool, DbError> {
        let affected = self
            .conn
            .execute("DELETE FROM chat_history WHERE id = ?", params![id])
            .await
            .map_err(|e| DbError::Query(format!("Failed to delete chunk: {}", e)))?;

        Ok(affected > 0)
    }

    /// Number of stored chunks
    pub async fn count_chunks(&self) -> Result<usize, DbError> {
        self.count("SELECT COUNT(*) FROM chat_history").await
    }

    /// Number of stored chunks that carry an embedding
    pub async fn count_embedded_chunks(&self) -> Result<usize, DbError> {
        self.count("SELECT COUNT(*) FROM chat_history WHERE embedding IS NOT NULL")
            .await
    }

    async fn count(&self, sql: &str) -> Result<usize, DbError> {
        let mut rows = self.execute_query(sql, params![]).await?;
        let row = match rows.next().await? {
            Some(row) => row,
            None => return Ok(0),
        };

        let count: i64 = row
            .get(0)
            .map_err(|e| DbError::Data(format!("Failed to get count: {}", e)))?;
        Ok(count as usize)
    }
}

impl ChunkStore for Database {
    #[instrument(skip(self, query_embedding), fields(dims = query_embedding.len()))]
    async fn match_chunks(
        &self,
        query_embedding: &[f32],
        threshold: f64,
        count: usize,
    ) -> Result<Vec<SimilarityMatch>, DbError> {
        let sql = format!(
            "SELECT c.id, c.chunk_text, 1 - vector_distance_cos(c.embedding, ?1) AS similarity
             FROM vector_top_k('{VECTOR_INDEX}', ?1, ?2) AS v
             JOIN chat_history c ON c.rowid = v.id
             WHERE c.embedding IS NOT NULL
               AND 1 - vector_distance_cos(c.embedding, ?1) > ?3
             ORDER BY similarity DESC, c.rowid ASC
             LIMIT ?2"
        );

        let params = vec![
            Value::Blob(query_embedding.to_vec().to_binary()),
            Value::Integer(count as i64),
            Value::Real(threshold),
        ];

        let mut rows = self.execute_query(&sql, params).await?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            matches.push(SimilarityMatch {
                id: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
                content: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get content: {}", e)))?,
                similarity: row
                    .get(2)
                    .map_err(|e| DbError::Data(format!("Failed to get similarity: {}", e)))?,
            });
        }

        debug!("Vector query returned {} rows", matches.len());
        Ok(matches)
    }

    #[instrument(skip(self, query))]
    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<LexicalMatch>, DbError> {
        let keywords = keywords(query);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        // LIKE yields 0 or 1, so the sum counts the keywords a chunk contains
        let hits = (1..=keywords.len())
            .map(|i| format!("(chunk_text LIKE ?{i})"))
            .collect::<Vec<_>>()
            .join(" + ");
        let limit_param = keywords.len() + 1;
        let sql = format!(
            "SELECT chunk_text, tags FROM (
                SELECT chunk_text, tags, rowid AS position, {hits} AS hits
                FROM chat_history
             )
             WHERE hits > 0
             ORDER BY hits DESC, position ASC
             LIMIT ?{limit_param}"
        );

        let mut params: Vec<Value> = keywords
            .iter()
            .map(|keyword| Value::Text(format!("%{}%", keyword)))
            .collect();
        params.push(Value::Integer(limit as i64));

        let mut rows = self.execute_query(&sql, params).await?;

        let mut matches = Vec::new();
        while let Some(row) = rows.next().await? {
            let tags: String = row
                .get(1)
                .map_err(|e| DbError::Data(format!("Failed to get tags: {}", e)))?;
            matches.push(LexicalMatch {
                content: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get content: {}", e)))?,
                tags: parse_tags(&tags)?,
            });
        }

        debug!("Keyword query returned {} rows", matches.len());
        Ok(matches)
    }
}

/// Words too common to say anything about a chunk
const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "am", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by",
    "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "how", "i", "if",
    "in", "into", "is", "it", "its", "me", "my", "no", "not", "of", "on", "or", "our", "said",
    "say", "so", "that", "the", "their", "them", "then", "there", "these", "they", "this", "to",
    "was", "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would",
    "you", "your",
];

/// Lowercased, deduplicated alphanumeric words of a query, without stop words.
///
/// A query made only of stop words keeps all of them.
fn keywords(query: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    for word in query.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let word = word.to_lowercase();
        if !words.contains(&word) {
            words.push(word);
        }
    }

    let significant: Vec<String> = words
        .iter()
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .cloned()
        .collect();
    if significant.is_empty() {
        words
    } else {
        significant
    }
}

fn optional_text(value: Option<String>) -> Value {
    value.map(Value::Text).unwrap_or(Value::Null)
}

fn parse_tags(raw: &str) -> Result<Vec<String>, DbError> {
    serde_json::from_str(raw).map_err(|e| DbError::Data(format!("Failed to decode tags: {}", e)))
}

fn parse_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>, DbError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| DbError::Data(format!("Failed to parse timestamp {}: {}", value, e)))
    })
    .transpose()
}

/// Convert a database row to a ChatChunk
fn row_to_chunk(row: &Row) -> Result<ChatChunk, DbError> {
    let embedding_blob: Option<Vec<u8>> = row
        .get(3)
        .map_err(|e| DbError::Data(format!("Failed to get embedding: {}", e)))?;
    let tags: String = row
        .get(4)
        .map_err(|e| DbError::Data(format!("Failed to get tags: {}", e)))?;

    Ok(ChatChunk {
        id: row
            .get(0)
            .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?,
        user_id: row
            .get(1)
            .map_err(|e| DbError::Data(format!("Failed to get user_id: {}", e)))?,
        text: row
            .get(2)
            .map_err(|e| DbError::Data(format!("Failed to get chunk_text: {}", e)))?,
        embedding: embedding_blob.map(|blob| Vec::<f32>::from_binary(&blob)),
        tags: parse_tags(&tags)?,
        conv_start: parse_timestamp(
            row.get(5)
                .map_err(|e| DbError::Data(format!("Failed to get conv_start: {}", e)))?,
        )?,
        conv_end: parse_timestamp(
            row.get(6)
                .map_err(|e| DbError::Data(format!("Failed to get conv_end: {}", e)))?,
        )?,
    })
}
