//! Error types for the ApiFlow platform.
//!
//! `ServerError` covers startup and request-level failures (configuration,
//! bad input). When the `axum` feature is enabled, it also implements
//! `IntoResponse` so it can be used directly as an axum handler error type.
//!
//! `WorkflowError` is the taxonomy of failures a single workflow run can hit.
//! Its `Display` text is exactly what the `error` stream event carries.

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Failures that can occur while a workflow run is executing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// The reasoning capability could not produce a valid plan. Fatal.
    #[error("Failed to generate a plan: {0}")]
    Planning(String),

    /// The reasoning capability could not produce valid action details for a step.
    #[error("LLM failed to structure the API call details.")]
    ActionSynthesis,

    /// The target API answered with an error status.
    #[error("API call failed with status {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    /// The request never produced a response (timeout, connection failure, ...).
    #[error("API call failed due to a network error: {0}")]
    Network(String),

    /// Extraction output could not be parsed. Logged, never surfaced to the stream.
    #[error("Data extraction failed: {0}")]
    Extraction(String),

    /// Anything that escaped the run (e.g. a panic in the run task).
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl WorkflowError {
    /// Whether this error stops the run once it is recorded in the run state.
    pub fn is_halting(&self) -> bool {
        !matches!(self, WorkflowError::Extraction(_))
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServerError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_messages() {
        let err = WorkflowError::HttpStatus {
            status: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "API call failed with status 404: Not Found");

        let err = WorkflowError::Network("operation timed out".to_string());
        assert_eq!(
            err.to_string(),
            "API call failed due to a network error: operation timed out"
        );
    }

    #[test]
    fn test_extraction_is_not_halting() {
        assert!(!WorkflowError::Extraction("bad json".to_string()).is_halting());
        assert!(WorkflowError::ActionSynthesis.is_halting());
        assert!(WorkflowError::Planning("x".to_string()).is_halting());
    }
}
