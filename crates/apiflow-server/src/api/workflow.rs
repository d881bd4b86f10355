//! Workflow API - /api/v1/workflow
//!
//! POST /api/v1/workflow/execute-stream - Run a prompt, streaming events over SSE
//! POST /api/v1/workflow/validate       - Validate a prompt without running it
//! GET  /api/v1/workflow/health         - Service health

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::pin::Pin;
use tokio_stream::StreamExt;

use apiflow_core::workflow::{validate_prompt, PromptValidation};
use apiflow_core::ServerError;

use crate::state::AppState;

type SseStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<Event, Infallible>> + Send>>;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/execute-stream", post(execute_stream))
        .route("/validate", post(validate))
        .route("/health", get(health))
}

#[derive(Debug, Deserialize)]
struct WorkflowRequest {
    #[serde(default)]
    prompt: String,
}

async fn execute_stream(
    State(state): State<AppState>,
    Json(body): Json<WorkflowRequest>,
) -> Result<Sse<SseStream>, ServerError> {
    let validation = validate_prompt(&body.prompt);
    if !validation.valid {
        let reason = validation.error.unwrap_or_default();
        tracing::warn!("[Workflow] Rejected prompt: {}", reason);
        return Err(ServerError::BadRequest(reason));
    }

    tracing::info!("[Workflow] Streaming run for prompt: {}", body.prompt);

    let events = state
        .executor
        .stream(body.prompt)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));

    Ok(Sse::new(Box::pin(events) as SseStream))
}

async fn validate(Json(body): Json<WorkflowRequest>) -> (StatusCode, Json<PromptValidation>) {
    let validation = validate_prompt(&body.prompt);
    let status = if validation.valid {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(validation))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "workflow",
        "message": "Workflow service is running",
    }))
}
