//! Step Executor — synthesizes, resolves and dispatches one `api_call` step.

use std::time::Duration;

use serde_json::{json, Value};

use crate::error::WorkflowError;
use crate::workflow::dispatcher::{DispatchError, DispatchRequest, DispatchResponse, HttpDispatcher};
use crate::workflow::reasoning::{ActionRequest, ReasoningCapability};
use crate::workflow::schema::{ActionDetails, ExtractedData};
use crate::workflow::template::{substitute, substitute_str};

/// Result of a dispatched step, successful or not.
#[derive(Debug, Clone)]
pub struct ApiStepOutcome {
    /// Action details after placeholder substitution
    pub action_details: ActionDetails,
    /// Parsed body, `{raw_content}` wrapper, or `{error, content}` payload
    pub response_data: Value,
    /// Dispatch failure, if any
    pub error: Option<WorkflowError>,
}

/// Execute one `api_call` step.
///
/// Returns `Err(WorkflowError::ActionSynthesis)` when the model cannot produce
/// valid action details; nothing is dispatched in that case. Every other
/// outcome, including dispatch failures, is an `Ok` outcome to be recorded.
pub async fn execute_api_step(
    reasoner: &dyn ReasoningCapability,
    dispatcher: &dyn HttpDispatcher,
    timeout: Duration,
    step_description: &str,
    user_prompt: &str,
    extracted_data: &ExtractedData,
) -> Result<ApiStepOutcome, WorkflowError> {
    let template = reasoner
        .action_details(ActionRequest {
            user_prompt,
            step_description,
            extracted_data,
        })
        .await
        .map_err(|e| {
            tracing::error!("[StepExecutor] LLM failed to generate valid action details: {}", e);
            WorkflowError::ActionSynthesis
        })?;

    let action_details = resolve_action(&template, extracted_data);
    tracing::info!(
        "[StepExecutor] Dispatching {} {}",
        action_details.method,
        action_details.url
    );

    let result = dispatcher
        .request(DispatchRequest::from_action(&action_details, timeout))
        .await;
    let (response_data, error) = classify_response(result);

    Ok(ApiStepOutcome {
        action_details,
        response_data,
        error,
    })
}

/// Substitute placeholders across url, body and headers.
pub fn resolve_action(template: &ActionDetails, bindings: &ExtractedData) -> ActionDetails {
    ActionDetails {
        url: substitute_str(&template.url, bindings),
        method: template.method,
        body: template.body.as_ref().map(|body| {
            body.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect()
        }),
        headers: template.headers.as_ref().map(|headers| {
            headers
                .iter()
                .map(|(k, v)| (k.clone(), substitute_str(v, bindings)))
                .collect()
        }),
    }
}

/// Turn a dispatch result into the recorded response payload and optional error.
pub fn classify_response(
    result: Result<DispatchResponse, DispatchError>,
) -> (Value, Option<WorkflowError>) {
    match result {
        Ok(response) if response.is_success() => {
            match serde_json::from_str::<Value>(&response.body) {
                Ok(data) => {
                    tracing::info!("[StepExecutor] API responded {} with JSON", response.status);
                    (data, None)
                }
                Err(_) => {
                    tracing::warn!("[StepExecutor] API response was not valid JSON. Storing raw text.");
                    (json!({ "raw_content": response.body }), None)
                }
            }
        }
        Ok(response) => {
            tracing::error!("[StepExecutor] HTTP Error: {} {}", response.status, response.reason);
            let error = WorkflowError::HttpStatus {
                status: response.status,
                reason: response.reason,
            };
            let data = json!({ "error": error.to_string(), "content": response.body });
            (data, Some(error))
        }
        Err(e) => {
            tracing::error!("[StepExecutor] Request failed: {}", e);
            let error = WorkflowError::Network(e.to_string());
            (json!({ "error": error.to_string() }), Some(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::schema::HttpMethod;
    use std::collections::HashMap;

    fn response(status: u16, reason: &str, body: &str) -> DispatchResponse {
        DispatchResponse {
            status,
            reason: reason.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_classify_json_success() {
        let (data, error) = classify_response(Ok(response(200, "OK", r#"{"id": 1}"#)));
        assert_eq!(data, json!({"id": 1}));
        assert!(error.is_none());
    }

    #[test]
    fn test_classify_non_json_success() {
        let (data, error) = classify_response(Ok(response(200, "OK", "<html>hi</html>")));
        assert_eq!(data, json!({"raw_content": "<html>hi</html>"}));
        assert!(error.is_none());
    }

    #[test]
    fn test_classify_redirect_status_is_success() {
        let (_, error) = classify_response(Ok(response(304, "Not Modified", "")));
        assert!(error.is_none());
    }

    #[test]
    fn test_classify_http_error() {
        let (data, error) = classify_response(Ok(response(404, "Not Found", "no such user")));
        assert_eq!(
            error,
            Some(WorkflowError::HttpStatus {
                status: 404,
                reason: "Not Found".to_string()
            })
        );
        assert_eq!(data["error"], "API call failed with status 404: Not Found");
        assert_eq!(data["content"], "no such user");
    }

    #[test]
    fn test_classify_network_error() {
        let (data, error) =
            classify_response(Err(DispatchError::Network("connection refused".to_string())));
        assert_eq!(error, Some(WorkflowError::Network("connection refused".to_string())));
        assert_eq!(
            data,
            json!({"error": "API call failed due to a network error: connection refused"})
        );
    }

    #[test]
    fn test_resolve_action_substitutes_everywhere() {
        let mut bindings = ExtractedData::new();
        bindings.insert("auth_token".to_string(), json!("xyz"));
        bindings.insert("user_id".to_string(), json!(42));

        let template = ActionDetails {
            url: "https://api.example.com/users/{user_id}".to_string(),
            method: HttpMethod::Put,
            body: Some(
                json!({"owner": "{user_id}", "tags": ["{auth_token}", "{missing}"]})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ),
            headers: Some(HashMap::from([(
                "Authorization".to_string(),
                "Bearer {auth_token}".to_string(),
            )])),
        };

        let resolved = resolve_action(&template, &bindings);
        assert_eq!(resolved.url, "https://api.example.com/users/42");
        assert_eq!(resolved.method, HttpMethod::Put);
        let body = resolved.body.unwrap();
        assert_eq!(body["owner"], "42");
        assert_eq!(body["tags"], json!(["xyz", "{missing}"]));
        assert_eq!(resolved.headers.unwrap()["Authorization"], "Bearer xyz");
    }
}
