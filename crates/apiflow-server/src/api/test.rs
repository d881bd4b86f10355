//! Test API - /api/v1/test
//!
//! GET /api/v1/test/test - Connectivity check used by the frontend

use axum::{routing::get, Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/test", get(test_endpoint))
}

async fn test_endpoint() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "This is a test endpoint!" }))
}
