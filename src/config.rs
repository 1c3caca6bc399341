//! # Configuration Module
//!
//! Runtime settings for the search-and-answer pipeline: provider endpoints and
//! models, retrieval thresholds, prompt limits, timeouts and the HTTP listener.
//!
//! ## Key Components
//!
//! - `Config`: The complete, validated configuration
//! - `ConfigBuilder`: Builder pattern implementation with validation on `build()`
//!
//! Defaults: a 0.7 similarity floor, five vector matches, three lexical
//! fallback matches, a temperature of 0.7 and a 1000 token answer cap.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Default OpenAI-compatible API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Dimensionality of `text-embedding-3-small` vectors
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Default completion model
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

/// Similarity a vector match must exceed
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;

/// Vector matches placed into the prompt
pub const DEFAULT_MATCH_COUNT: usize = 5;

/// Keyword matches used when the vector query fails
pub const DEFAULT_FALLBACK_LIMIT: usize = 3;

/// Character budget for the assembled context
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

/// Seconds each upstream call may take
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_PATH: &str = "memex.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

/// Complete configuration for a memex process
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the embedding and completion provider
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible provider
    pub api_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Dimensionality of stored and query embeddings
    pub embedding_dimensions: usize,

    /// Completion model name
    pub completion_model: String,

    /// Sampling temperature for answer generation
    pub temperature: f64,

    /// Output token cap for answer generation
    pub max_tokens: u32,

    /// Minimum similarity a vector match must exceed
    pub match_threshold: f64,

    /// Maximum number of vector matches
    pub match_count: usize,

    /// Maximum number of lexical fallback matches
    pub fallback_limit: usize,

    /// Character budget for the assembled context, `None` for unbounded
    pub max_context_chars: Option<usize>,

    /// Timeout applied to every upstream call
    pub upstream_timeout: Duration,

    /// Embedding requests allowed per minute
    pub embedding_rate_per_minute: u32,

    /// Completion requests allowed per minute
    pub completion_rate_per_minute: u32,

    /// Include upstream failure detail in 500 responses
    pub expose_error_details: bool,

    /// Path of the local chunk store
    pub database_path: PathBuf,

    /// Listener host
    pub host: String,

    /// Listener port
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            match_count: DEFAULT_MATCH_COUNT,
            fallback_limit: DEFAULT_FALLBACK_LIMIT,
            max_context_chars: Some(DEFAULT_MAX_CONTEXT_CHARS),
            upstream_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            embedding_rate_per_minute: 1000,
            completion_rate_per_minute: 500,
            expose_error_details: true,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Create a new builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// The provider API key, or a configuration error if none was supplied
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY must be set".to_string()))
    }

    /// Check invariants between fields
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(Error::Config(format!(
                "match threshold must be within [0, 1], got {}",
                self.match_threshold
            )));
        }
        if self.match_count == 0 {
            return Err(Error::Config("match count must be positive".to_string()));
        }
        if self.fallback_limit == 0 {
            return Err(Error::Config("fallback limit must be positive".to_string()));
        }
        if self.embedding_dimensions == 0 {
            return Err(Error::Config(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        if self.max_context_chars == Some(0) {
            return Err(Error::Config(
                "context budget must be positive when set".to_string(),
            ));
        }
        if self.embedding_rate_per_minute == 0 || self.completion_rate_per_minute == 0 {
            return Err(Error::Config("rate limits must be positive".to_string()));
        }
        if self.upstream_timeout.is_zero() {
            return Err(Error::Config("upstream timeout must be positive".to_string()));
        }
        Url::parse(&self.api_base_url).map_err(|e| {
            Error::Config(format!("invalid API base URL {}: {}", self.api_base_url, e))
        })?;
        Ok(())
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the provider API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set the provider base URL
    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.config.api_base_url = api_base_url.into();
        self
    }

    /// Set the embedding model
    pub fn embedding_model(mut self, embedding_model: impl Into<String>) -> Self {
        self.config.embedding_model = embedding_model.into();
        self
    }

    /// Set the embedding dimensions
    pub fn embedding_dimensions(mut self, embedding_dimensions: usize) -> Self {
        self.config.embedding_dimensions = embedding_dimensions;
        self
    }

    /// Set the completion model
    pub fn completion_model(mut self, completion_model: impl Into<String>) -> Self {
        self.config.completion_model = completion_model.into();
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the answer token cap
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the similarity threshold
    pub fn match_threshold(mut self, match_threshold: f64) -> Self {
        self.config.match_threshold = match_threshold;
        self
    }

    /// Set the vector match count
    pub fn match_count(mut self, match_count: usize) -> Self {
        self.config.match_count = match_count;
        self
    }

    /// Set the lexical fallback limit
    pub fn fallback_limit(mut self, fallback_limit: usize) -> Self {
        self.config.fallback_limit = fallback_limit;
        self
    }

    /// Set the context character budget
    pub fn max_context_chars(mut self, max_context_chars: Option<usize>) -> Self {
        self.config.max_context_chars = max_context_chars;
        self
    }

    /// Set the upstream timeout
    pub fn upstream_timeout(mut self, upstream_timeout: Duration) -> Self {
        self.config.upstream_timeout = upstream_timeout;
        self
    }

    /// Set the provider rate limits (requests per minute)
    pub fn rate_limits(mut self, embedding_per_minute: u32, completion_per_minute: u32) -> Self {
        self.config.embedding_rate_per_minute = embedding_per_minute;
        self.config.completion_rate_per_minute = completion_per_minute;
        self
    }

    /// Choose whether 500 responses carry upstream detail
    pub fn expose_error_details(mut self, expose: bool) -> Self {
        self.config.expose_error_details = expose;
        self
    }

    /// Set the chunk store path
    pub fn database_path(mut self, database_path: impl Into<PathBuf>) -> Self {
        self.config.database_path = database_path.into();
        self
    }

    /// Set the listener address
    pub fn listen(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.host = host.into();
        self.config.port = port;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
