//! Workflow progress events and their wire framings.
//!
//! Every event serializes as `{"event": <name>, "data": <payload>}`:
//!
//! - `plan_created` — the generated plan
//! - `api_call_completed` — one dispatched `api_call` step
//! - `data_extracted` — one executed extraction step
//! - `error` — the run halted (at most once)
//! - `end` — always the last event of a run

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::workflow::schema::{ActionDetails, ExtractedData, Plan};

pub const END_MESSAGE: &str = "Workflow finished.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WorkflowEvent {
    PlanCreated(Plan),
    ApiCallCompleted(StepResponse),
    DataExtracted(ExtractionDetails),
    Error(ErrorDetail),
    End(EndMessage),
}

/// Payload of `api_call_completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResponse {
    pub step_title: String,
    pub request_details: ActionDetails,
    pub response_details: serde_json::Value,
    /// Always `null` for API steps; kept for payload compatibility
    pub extracted_data: Option<ExtractedData>,
}

/// Payload of `data_extracted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionDetails {
    pub step_title: String,
    /// The full accumulated mapping, not just the latest bundle
    pub extracted_data: ExtractedData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndMessage {
    pub message: String,
}

impl WorkflowEvent {
    pub fn error(detail: impl Into<String>) -> Self {
        Self::Error(ErrorDetail {
            detail: detail.into(),
        })
    }

    pub fn end() -> Self {
        Self::End(EndMessage {
            message: END_MESSAGE.to_string(),
        })
    }

    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlanCreated(_) => "plan_created",
            Self::ApiCallCompleted(_) => "api_call_completed",
            Self::DataExtracted(_) => "data_extracted",
            Self::Error(_) => "error",
            Self::End(_) => "end",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End(_))
    }

    /// `{"event": ..., "data": ...}` as compact JSON.
    pub fn to_json(&self) -> String {
        // Every payload is a plain tree of strings, maps and JSON values.
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "event": "error", "data": { "detail": e.to_string() } }).to_string()
        })
    }

    /// Newline-delimited JSON line: `<json>\n`.
    pub fn to_ndjson_line(&self) -> String {
        format!("{}\n", self.to_json())
    }
}

/// The consumer dropped the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event stream consumer disconnected")]
pub struct StreamClosed;

/// Sending half of a run's event stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<WorkflowEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<WorkflowEvent>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: WorkflowEvent) -> Result<(), StreamClosed> {
        tracing::debug!("[Events] Emitting {}", event.name());
        self.tx.send(event).await.map_err(|_| StreamClosed)
    }

    /// True once the receiving side is gone; no further work should be started.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::schema::{HttpMethod, PlanStep};
    use serde_json::json;

    #[test]
    fn test_plan_created_shape() {
        let event = WorkflowEvent::PlanCreated(Plan::new(vec![PlanStep::api_call("List users")]));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "event": "plan_created",
                "data": { "steps": [ { "description": "List users", "action_type": "api_call" } ] }
            })
        );
    }

    #[test]
    fn test_api_call_completed_shape() {
        let event = WorkflowEvent::ApiCallCompleted(StepResponse {
            step_title: "Step 1: List users".to_string(),
            request_details: ActionDetails {
                url: "https://api.example.com/users".to_string(),
                method: HttpMethod::Get,
                body: None,
                headers: None,
            },
            response_details: json!([{"id": 1}]),
            extracted_data: None,
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "api_call_completed");
        assert_eq!(value["data"]["step_title"], "Step 1: List users");
        assert_eq!(value["data"]["request_details"]["method"], "GET");
        assert_eq!(value["data"]["response_details"], json!([{"id": 1}]));
        assert!(value["data"]["extracted_data"].is_null());
    }

    #[test]
    fn test_framings() {
        let end = WorkflowEvent::end();
        assert_eq!(
            end.to_json(),
            "{\"event\":\"end\",\"data\":{\"message\":\"Workflow finished.\"}}"
        );
        assert_eq!(
            WorkflowEvent::error("boom").to_ndjson_line(),
            "{\"event\":\"error\",\"data\":{\"detail\":\"boom\"}}\n"
        );
        assert!(end.is_terminal());
        assert_eq!(end.name(), "end");
    }

    #[test]
    fn test_events_round_trip_through_json() {
        let event = WorkflowEvent::error("API call failed with status 404: Not Found");
        let parsed: WorkflowEvent = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(parsed, event);
    }

    #[tokio::test]
    async fn test_sink_reports_closed_consumer() {
        let (tx, rx) = mpsc::channel(1);
        let sink = EventSink::new(tx);
        assert!(!sink.is_closed());
        drop(rx);
        assert!(sink.is_closed());
        assert_eq!(sink.emit(WorkflowEvent::end()).await, Err(StreamClosed));
    }
}
