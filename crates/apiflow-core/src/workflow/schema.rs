//! Data model for workflow runs.
//!
//! A plan produced by the reasoning model looks like:
//!
//! ```json
//! {
//!   "steps": [
//!     { "description": "Log in with username 'admin' and password 'pass123'.",
//!       "action_type": "api_call" },
//!     { "description": "Extract the auth token from the login response.",
//!       "action_type": "data_extraction" },
//!     { "description": "Using the auth token from the login step, fetch the profile.",
//!       "action_type": "api_call" }
//!   ]
//! }
//! ```
//!
//! Each `api_call` step is later turned into an [`ActionDetails`] whose
//! strings may reference previously extracted data as `{placeholder}`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Accumulated key-value store carried across the steps of one run.
pub type ExtractedData = serde_json::Map<String, serde_json::Value>;

/// The kind of work a plan step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Synthesize and dispatch one HTTP request
    ApiCall,
    /// Pull values out of the latest response for the next step
    DataExtraction,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiCall => "api_call",
            Self::DataExtraction => "data_extraction",
        }
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Human-readable summary; carries every literal value and dependency
    /// the step needs.
    pub description: String,
    pub action_type: ActionType,
}

impl PlanStep {
    pub fn api_call(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            action_type: ActionType::ApiCall,
        }
    }

    pub fn data_extraction(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            action_type: ActionType::DataExtraction,
        }
    }
}

/// Ordered list of steps. Order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlanStep> {
        self.steps.get(index)
    }
}

/// HTTP methods a workflow step may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete HTTP request for one `api_call` step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDetails {
    /// Full endpoint URL, possibly containing `{placeholder}` tokens
    pub url: String,
    pub method: HttpMethod,
    /// JSON body for POST/PUT/PATCH requests
    #[serde(default)]
    pub body: Option<serde_json::Map<String, serde_json::Value>>,
    /// Request headers, e.g. `Authorization: Bearer {auth_token}`
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

/// Log entry for one dispatched `api_call` step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHistoryEntry {
    pub step_index: usize,
    /// Action details after placeholder substitution
    pub action_details: ActionDetails,
    /// Parsed response, `{raw_content}` wrapper, or `{error, content}` payload
    pub response_data: serde_json::Value,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// What a failed dispatch does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailurePolicy {
    /// Stop the run at the first failed request (default)
    #[default]
    Halt,
    /// Record the failure and move on to the next step
    Continue,
}

impl DispatchFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "halt" | "stop" => Some(Self::Halt),
            "continue" => Some(Self::Continue),
            _ => None,
        }
    }
}
