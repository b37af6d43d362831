//! HTTP server for ingestion and search.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/vectorize` | Ingest `{repo_name, files: [{path, content}]}` |
//! | `GET`  | `/search` | `?repo_name=..&q=..&k=..`, returns `{results}` |
//! | `POST` | `/analyze` | Clone or update `{repo_url}` and ingest it |
//! | `GET`  | `/namespaces` | List namespaces with record counts |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "No files provided" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embedding_error` (502),
//! `index_unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use repo_vectorizer_core::models::{FileRecord, IngestResult, NamespaceInfo, SearchResult};
use repo_vectorizer_core::RetrievalError;

use crate::config::{AnalyzerConfig, Config};
use crate::connector_git::{analyze_repository, AnalyzeOutcome};
use crate::engine::{open_engine, RetrievalEngine};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<RetrievalEngine>,
    analyzer: Arc<AnalyzerConfig>,
}

impl AppState {
    pub fn new(engine: Arc<RetrievalEngine>, analyzer: AnalyzerConfig) -> Self {
        Self {
            engine,
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Build the router with every route and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/vectorize", post(handle_vectorize))
        .route("/search", get(handle_search))
        .route("/analyze", post(handle_analyze))
        .route("/namespaces", get(handle_namespaces))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Open the index, build the engine, and serve until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = open_engine(config).await?;
    let state = AppState::new(Arc::new(engine), config.analyzer.clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Converts into an HTTP response with the JSON error envelope.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, message = %self.message, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        let (status, code) = match &err {
            RetrievalError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RetrievalError::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding_error"),
            RetrievalError::IndexUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "index_unavailable")
            }
            RetrievalError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RetrievalError>() {
            Ok(retrieval) => retrieval.into(),
            Err(other) => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: format!("{:#}", other),
            },
        }
    }
}

// ============ POST /vectorize ============

#[derive(Deserialize)]
struct VectorizeRequest {
    repo_name: String,
    #[serde(default)]
    files: Vec<FileRecord>,
}

async fn handle_vectorize(
    State(state): State<AppState>,
    payload: Result<Json<VectorizeRequest>, JsonRejection>,
) -> Result<Json<IngestResult>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.files.is_empty() {
        return Err(bad_request("No files provided"));
    }

    let result = state.engine.ingest(&req.repo_name, &req.files).await?;
    Ok(Json(result))
}

// ============ GET /search ============

#[derive(Deserialize)]
struct SearchParams {
    repo_name: String,
    q: String,
    k: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let results = state
        .engine
        .search(&params.repo_name, &params.q, params.k)
        .await?;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    repo_url: String,
}

async fn handle_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeOutcome>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.repo_url.trim().is_empty() {
        return Err(bad_request("repo_url is required"));
    }

    let outcome = analyze_repository(&state.engine, &req.repo_url, &state.analyzer).await?;
    Ok(Json(outcome))
}

// ============ GET /namespaces ============

#[derive(Serialize)]
struct NamespacesResponse {
    namespaces: Vec<NamespaceInfo>,
}

async fn handle_namespaces(
    State(state): State<AppState>,
) -> Result<Json<NamespacesResponse>, AppError> {
    let namespaces = state.engine.list_namespaces().await?;
    Ok(Json(NamespacesResponse { namespaces }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
