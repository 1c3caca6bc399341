//! # memex CLI Application
//!
//! Command-line entry point for the memex search-and-answer service.
//!
//! ## Subcommands
//!
//! - `serve`: Run the HTTP service (`POST /chat-search`, `GET /health`)
//! - `ask`: Run one search-and-answer cycle locally and print the answer
//! - `stats`: Show how many chunks are stored and how many carry embeddings
//!
//! Provider credentials come from `OPENAI_API_KEY`; everything else has a
//! flag, most with an environment variable fallback.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use memex::config::{
    Config, ConfigBuilder, DEFAULT_API_BASE_URL, DEFAULT_COMPLETION_MODEL, DEFAULT_DATABASE_PATH,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_HOST, DEFAULT_MATCH_COUNT,
    DEFAULT_MATCH_THRESHOLD, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
};
use memex::index::Database;
use memex::model::Client;
use memex::search::SearchOrchestrator;
use telemetry::TelemetryOptions;
use tracing::instrument;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Semantic search and grounded answers over archived assistant conversations",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "MEMEX_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),

    /// Answer a single query from the command line
    Ask(AskArgs),

    /// Show chunk counts for the database
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Database path
    #[arg(long, env = "MEMEX_DATABASE", default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,

    /// Embedding vector dimensionality
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,
}

#[derive(Args, Debug)]
struct ProviderArgs {
    /// API key for the OpenAI-compatible provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible provider
    #[arg(long, env = "MEMEX_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Embedding model
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Completion model
    #[arg(long, default_value = DEFAULT_COMPLETION_MODEL)]
    completion_model: String,

    /// Minimum similarity a match must exceed
    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    match_threshold: f64,

    /// Maximum number of vector matches
    #[arg(long, default_value_t = DEFAULT_MATCH_COUNT)]
    match_count: usize,

    /// Character budget for the prompt context (0 for unbounded)
    #[arg(long, default_value_t = DEFAULT_MAX_CONTEXT_CHARS)]
    max_context_chars: usize,

    /// Timeout for each upstream call, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Address to listen on
    #[arg(long, env = "MEMEX_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(long, env = "MEMEX_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Leave upstream failure detail out of 500 responses
    #[arg(long)]
    hide_error_details: bool,
}

#[derive(Args, Debug)]
struct AskArgs {
    /// The question to answer
    #[arg(required = true)]
    query: String,

    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber(&TelemetryOptions {
        log_dir: cli.log_dir.clone(),
    })?;

    match cli.command {
        Commands::Serve(args) => serve_command(args).await?,
        Commands::Ask(args) => ask_command(args).await?,
        Commands::Stats(args) => stats_command(args).await?,
    }

    Ok(())
}

fn config_builder(common: &CommonArgs, provider: &ProviderArgs) -> ConfigBuilder {
    let mut builder = Config::builder()
        .api_base_url(&provider.api_base_url)
        .embedding_model(&provider.embedding_model)
        .embedding_dimensions(common.embedding_dimensions)
        .completion_model(&provider.completion_model)
        .match_threshold(provider.match_threshold)
        .match_count(provider.match_count)
        .max_context_chars((provider.max_context_chars > 0).then_some(provider.max_context_chars))
        .upstream_timeout(Duration::from_secs(provider.timeout_secs))
        .database_path(&common.database);
    if let Some(api_key) = &provider.api_key {
        builder = builder.api_key(api_key);
    }
    builder
}

#[instrument(skip_all)]
async fn serve_command(args: ServeArgs) -> memex::Result<()> {
    let config = config_builder(&args.common, &args.provider)
        .listen(&args.host, args.port)
        .expose_error_details(!args.hide_error_details)
        .build()?;

    memex::server::run_server(&config).await
}

#[instrument(skip_all)]
async fn ask_command(args: AskArgs) -> memex::Result<()> {
    let config = config_builder(&args.common, &args.provider).build()?;

    let store =
        Database::new_from_path(&config.database_path, config.embedding_dimensions).await?;
    let client = Client::new_openai(&config)?;
    let orchestrator = SearchOrchestrator::new(client, store, &config);

    let response = orchestrator.ask(&args.query).await?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        _ => {
            println!("{}", response.response);
            println!();
            println!("(grounded in {} stored chunks)", response.context_found);
        }
    }

    Ok(())
}

async fn stats_command(args: StatsArgs) -> memex::Result<()> {
    let db =
        Database::new_from_path(&args.common.database, args.common.embedding_dimensions).await?;

    let total = db.count_chunks().await?;
    let embedded = db.count_embedded_chunks().await?;

    println!("Database: {}", args.common.database.display());
    println!("Dimensions: {}", db.dimensions());
    println!("Chunks: {}", total);
    println!("Embedded: {}", embedded);
    println!("Awaiting embedding: {}", total.saturating_sub(embedded));

    Ok(())
}
