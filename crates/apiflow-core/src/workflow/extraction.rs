//! Data Extraction Stage — turns the latest response into reusable key-value data.
//!
//! Extraction never halts a run: bad model output is logged and the run
//! continues with the data it already had.

use crate::error::WorkflowError;
use crate::workflow::reasoning::{strip_code_fence, ExtractionRequest, ReasoningCapability};
use crate::workflow::schema::ExtractedData;
use crate::workflow::state::RunState;

/// Why an extraction step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No response has been recorded yet
    NoResponse,
    /// The run already carries an error
    PriorError,
    /// The current step is the last one; nothing consumes the data
    LastStep,
}

/// Decide whether extraction should be skipped for the current step.
pub fn skip_reason(state: &RunState) -> Option<SkipReason> {
    if state.current_response.is_none() {
        Some(SkipReason::NoResponse)
    } else if state.error.is_some() {
        Some(SkipReason::PriorError)
    } else if state.next_step().is_none() {
        Some(SkipReason::LastStep)
    } else {
        None
    }
}

/// Ask the model for the values the next step needs and parse its reply.
///
/// `Err` is always [`WorkflowError::Extraction`], which callers log and ignore.
pub async fn extract_data(
    reasoner: &dyn ReasoningCapability,
    current_response: &serde_json::Value,
    next_step_description: &str,
) -> Result<ExtractedData, WorkflowError> {
    let raw = reasoner
        .extraction(ExtractionRequest {
            api_response: current_response,
            next_step_description,
        })
        .await
        .map_err(|e| WorkflowError::Extraction(e.to_string()))?;

    tracing::debug!("[Extraction] Raw LLM output: {}", raw);
    parse_extraction(&raw)
}

/// Parse `{"data": {...}}`, optionally wrapped in a code fence.
///
/// Empty output and a missing `data` key both mean "nothing to extract".
pub fn parse_extraction(raw: &str) -> Result<ExtractedData, WorkflowError> {
    let cleaned = strip_code_fence(raw);
    if cleaned.is_empty() {
        return Ok(ExtractedData::new());
    }

    let parsed: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| WorkflowError::Extraction(format!("invalid JSON: {}", e)))?;

    let root = parsed
        .as_object()
        .ok_or_else(|| WorkflowError::Extraction("expected a JSON object".to_string()))?;

    match root.get("data") {
        None | Some(serde_json::Value::Null) => Ok(ExtractedData::new()),
        Some(serde_json::Value::Object(data)) => Ok(data.clone()),
        Some(other) => Err(WorkflowError::Extraction(format!(
            "expected \"data\" to be an object, got {}",
            other
        ))),
    }
}
