//! # HTTP Surface
//!
//! Serves the search-and-answer pipeline over HTTP:
//!
//! - `POST /chat-search` with `{"query": "..."}` answers with
//!   `{"response": "...", "contextFound": n}`
//! - `OPTIONS /chat-search` is an empty preflight response
//! - `GET /health` reports liveness
//!
//! Every response allows any origin. A body that does not carry a non-blank
//! string `query` is a 400; any failure after validation is a 500.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{ChunkStore, Database};
use crate::model::{Client, CompletionModel, EmbeddingModel};
use crate::search::{QUERY_REQUIRED, SearchError, SearchOrchestrator, SearchRequest};

/// Headers a browser client may send with a search request
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

const INTERNAL_ERROR: &str = "Internal server error";

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub struct AppState<C, E, S>
where
    C: CompletionModel,
    E: EmbeddingModel,
    S: ChunkStore,
{
    pub orchestrator: Arc<SearchOrchestrator<C, E, S>>,
    pub expose_error_details: bool,
}

impl<C, E, S> AppState<C, E, S>
where
    C: CompletionModel,
    E: EmbeddingModel,
    S: ChunkStore,
{
    pub fn new(orchestrator: SearchOrchestrator<C, E, S>, expose_error_details: bool) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            expose_error_details,
        }
    }
}

impl<C, E, S> Clone for AppState<C, E, S>
where
    C: CompletionModel,
    E: EmbeddingModel,
    S: ChunkStore,
{
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            expose_error_details: self.expose_error_details,
        }
    }
}

impl<C, E, S> std::fmt::Debug for AppState<C, E, S>
where
    C: CompletionModel,
    E: EmbeddingModel,
    S: ChunkStore,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("expose_error_details", &self.expose_error_details)
            .finish_non_exhaustive()
    }
}

pub fn app_router<C, E, S>(state: AppState<C, E, S>) -> Router
where
    C: CompletionModel + 'static,
    E: EmbeddingModel + 'static,
    S: ChunkStore + 'static,
{
    Router::new()
        .route(
            "/chat-search",
            post(chat_search::<C, E, S>).options(preflight),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Open the store, build the provider client and serve until ctrl-c
pub async fn run_server(config: &Config) -> Result<()> {
    let store = Database::new_from_path(&config.database_path, config.embedding_dimensions).await?;
    let client = Client::new_openai(config)?;
    let orchestrator = SearchOrchestrator::new(client, store, config);
    let app = app_router(AppState::new(orchestrator, config.expose_error_details));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| Error::Config(format!("invalid listen address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("memex listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "memex"}))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn chat_search<C, E, S>(State(state): State<AppState<C, E, S>>, body: Bytes) -> Response
where
    C: CompletionModel + 'static,
    E: EmbeddingModel + 'static,
    S: ChunkStore + 'static,
{
    let request = match serde_json::from_slice::<SearchRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejecting unparseable body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, QUERY_REQUIRED, None);
        }
    };

    match state.orchestrator.handle(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => failure_response(&e, state.expose_error_details),
    }
}

fn failure_response(err: &SearchError, expose_details: bool) -> Response {
    if err.is_client_error() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string(), None);
    }

    error!(error = %err, "Chat search failed");
    let details = expose_details.then(|| err.to_string());
    error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, details)
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
        details,
    };
    (status, Json(body)).into_response()
}
