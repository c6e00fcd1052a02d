//! HTTP request handlers for the codescribe API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Answer, IngestSummary};

use super::AppState;

/// Build the axum router with all routes
pub fn router(state: Arc<AppState>) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route("/ingest", post(ingest))
        .route("/ask", post(ask))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every response is wrapped in `{success, data}` or `{success, error}`
#[derive(Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type ErrorResponse = (StatusCode, Json<Envelope<()>>);
type ApiResult<T> = Result<Json<Envelope<T>>, ErrorResponse>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        data: Some(data),
        error: None,
    }))
}

fn error_body(status: StatusCode, message: String) -> ErrorResponse {
    (
        status,
        Json(Envelope {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
}

fn bad_request(message: &str) -> ErrorResponse {
    error_body(StatusCode::BAD_REQUEST, message.to_string())
}

/// HTTP status for each error kind
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Source(_) | Error::Parse(_) => StatusCode::BAD_REQUEST,
        Error::Relevance(_) => StatusCode::NOT_FOUND,
        Error::Embedding(_) | Error::Generation(_) => StatusCode::BAD_GATEWAY,
        Error::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        Error::Format(_) | Error::Store(_) | Error::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map core errors to HTTP responses
fn api_error(err: Error) -> ErrorResponse {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error_chain(&err));
    } else {
        tracing::debug!(%err, "request rejected");
    }
    error_body(status, err.to_string())
}

/// The error and its sources joined with ": "
fn error_chain(err: &Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

// -- /ingest --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct IngestRequest {
    repo_path: String,
}

pub(super) async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> ApiResult<IngestSummary> {
    let source = req.repo_path.trim();
    if source.is_empty() {
        return Err(bad_request("repoPath is required"));
    }

    let cancel = state.shutdown.child_token();
    let summary = state
        .assistant
        .ingest(source, &cancel)
        .await
        .map_err(api_error)?;
    ok(summary)
}

// -- /ask --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AskRequest {
    question: String,
    top_k: Option<usize>,
    threshold: Option<f32>,
}

pub(super) async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> ApiResult<Answer> {
    let question = req.question.trim();
    if question.is_empty() {
        return Err(bad_request("question is required"));
    }

    let mut params = *state.assistant.search_params();
    if let Some(top_k) = req.top_k {
        params.top_k = top_k;
    }
    if let Some(threshold) = req.threshold {
        params.threshold = threshold;
    }

    let cancel = state.shutdown.child_token();
    let answer = state
        .assistant
        .ask_with(question, &params, &cancel)
        .await
        .map_err(api_error)?;
    ok(answer)
}

// -- /health --

#[derive(Serialize)]
pub(super) struct Health {
    status: &'static str,
    chunks: u64,
}

pub(super) async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Health> {
    let chunks = state.assistant.store().count().await.map_err(api_error)?;
    ok(Health {
        status: "ok",
        chunks,
    })
}
