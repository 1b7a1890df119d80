//! HTTP API for the browser extension.
//!
//! # Endpoints
//!
//! | Method | Path | Body | Description |
//! |--------|------|------|-------------|
//! | `POST` | `/text` | `{ text, word_count }` | Summarize raw text |
//! | `POST` | `/pdf` | multipart `file` + `word_count` | Summarize a PDF |
//! | `POST` | `/ms/{kind}` | multipart `file` + `word_count` | `word`, `excel` or `powerp` |
//! | `POST` | `/url` | `{ url, word_count }` | Web page or YouTube video |
//! | `GET`  | `/hello` | | Liveness check used by the extension |
//! | `GET`  | `/health` | | Health check (returns version) |
//!
//! Successful summaries return `{ "summary": …, "origin": … }`.
//!
//! # Error Contract
//!
//! ```json
//! { "detail": "no content found: ...", "kind": "no_content" }
//! ```
//!
//! Client-side failures (bad input, unsupported or unreadable documents,
//! unreachable pages, nothing to summarize) are `400`; LLM and internal
//! failures are `500`. Body rejections from axum's extractors are reported
//! as `invalid_request` rather than the framework's default `422`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted; the only client is a
//! browser extension running on arbitrary pages.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Path, State,
    },
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::SummarizeError;
use crate::llm::{create_client, LlmClient};
use crate::models::{DocumentFormat, Source, SummaryRequest, SummaryResult};
use crate::pipeline::Pipeline;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the HTTP server with the provider named in `[llm]`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let client = create_client(&config.llm)?;
    run_server_with_client(config, client).await
}

/// Like [`run_server`], but with a caller-supplied LLM client.
pub async fn run_server_with_client(
    config: &Config,
    client: Arc<dyn LlmClient>,
) -> anyhow::Result<()> {
    let pipeline = Arc::new(Pipeline::new(config, client)?);
    let app = router(config, pipeline.clone());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        provider = %config.llm.provider,
        model = pipeline.model_name(),
        "skimmer listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with CORS, tracing, timeout and body-limit layers.
pub fn router(config: &Config, pipeline: Arc<Pipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
        tracing::info_span!(
            "request",
            id = %uuid::Uuid::new_v4(),
            method = %req.method(),
            uri = %req.uri(),
        )
    });

    Router::new()
        .route("/text", post(handle_text))
        .route("/pdf", post(handle_pdf))
        .route("/ms/{kind}", post(handle_office))
        .route("/url", post(handle_url))
        .route("/hello", get(handle_hello))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(trace)
        .layer(cors)
        .with_state(AppState { pipeline })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
    kind: &'static str,
}

/// Converts a [`SummarizeError`] into a `{ detail, kind }` response.
struct AppError(SummarizeError);

impl From<SummarizeError> for AppError {
    fn from(err: SummarizeError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::warn!(kind = self.0.kind(), error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            detail: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status, Json(body)).into_response()
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|e| SummarizeError::InvalidRequest(e.body_text()).into())
}

async fn summarize(state: &AppState, request: SummaryRequest) -> Result<Json<SummaryResult>, AppError> {
    let outcome = state.pipeline.summarize(request).await?;
    tracing::info!(
        origin = %outcome.origin,
        path = ?outcome.path,
        llm_calls = outcome.llm_calls,
        "summary ready"
    );
    Ok(Json(outcome.into()))
}

// ============ POST /text ============

#[derive(Deserialize)]
struct TextRequest {
    text: String,
    word_count: i64,
}

async fn handle_text(
    State(state): State<AppState>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<SummaryResult>, AppError> {
    let body = json_body(body)?;
    summarize(
        &state,
        SummaryRequest::new(body.word_count, Source::RawText(body.text)),
    )
    .await
}

// ============ POST /url ============

#[derive(Deserialize)]
struct UrlRequest {
    url: String,
    word_count: i64,
}

async fn handle_url(
    State(state): State<AppState>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> Result<Json<SummaryResult>, AppError> {
    let body = json_body(body)?;
    if body.word_count <= 0 {
        return Err(SummarizeError::InvalidRequest(format!(
            "word_count must be positive, got {}",
            body.word_count
        ))
        .into());
    }
    let source = Source::from_url(&body.url)?;
    summarize(&state, SummaryRequest::new(body.word_count, source)).await
}

// ============ POST /pdf, /ms/{kind} ============

async fn handle_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResult>, AppError> {
    let request = read_upload(multipart, DocumentFormat::Pdf).await?;
    summarize(&state, request).await
}

async fn handle_office(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummaryResult>, AppError> {
    let format: DocumentFormat = kind.parse()?;
    if !format.is_office() {
        return Err(SummarizeError::UnsupportedFormat(kind).into());
    }
    let request = read_upload(multipart, format).await?;
    summarize(&state, request).await
}

/// Reads the `file` and `word_count` fields of an upload form.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
    format: DocumentFormat,
) -> Result<SummaryRequest, AppError> {
    let mut multipart =
        multipart.map_err(|e| SummarizeError::InvalidRequest(e.body_text()))?;

    let mut bytes = None;
    let mut word_count = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SummarizeError::InvalidRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| SummarizeError::InvalidRequest(e.body_text()))?;
                bytes = Some(data.to_vec());
            }
            Some("word_count") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| SummarizeError::InvalidRequest(e.body_text()))?;
                let parsed = raw.trim().parse::<i64>().map_err(|_| {
                    SummarizeError::InvalidRequest(format!("word_count is not an integer: {}", raw))
                })?;
                word_count = Some(parsed);
            }
            _ => {}
        }
    }

    let word_count = word_count
        .ok_or_else(|| SummarizeError::InvalidRequest("missing form field: word_count".into()))?;
    let bytes =
        bytes.ok_or_else(|| SummarizeError::InvalidRequest("missing form field: file".into()))?;

    tracing::debug!(%format, bytes = bytes.len(), "upload received");
    Ok(SummaryRequest::new(word_count, Source::Document { bytes, format }))
}

// ============ GET /hello, /health ============

#[derive(Serialize)]
struct HelloResponse {
    message: &'static str,
}

async fn handle_hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from skimmer",
    })
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
