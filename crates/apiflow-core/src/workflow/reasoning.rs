//! Reasoning capability — the LLM seen as a structured-output service.
//!
//! The engine only depends on the [`ReasoningCapability`] trait, with one
//! method per output shape. [`LlmReasoner`] is the HTTP-backed implementation;
//! tests substitute scripted fakes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::workflow::agent_caller::{AgentCallConfig, AgentCaller};
use crate::workflow::prompts;
use crate::workflow::schema::{ActionDetails, ExtractedData, Plan};

/// Failure of a reasoning call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// The model could not be reached.
    #[error("Request error: {0}")]
    Request(String),

    /// The model answered with an error.
    #[error("Model error: {0}")]
    Model(String),

    /// The model's output did not match the expected shape.
    #[error("Schema violation: {0}")]
    Schema(String),
}

/// Context for synthesizing one step's HTTP request.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    pub user_prompt: &'a str,
    pub step_description: &'a str,
    pub extracted_data: &'a ExtractedData,
}

/// Context for extracting data from a response.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub api_response: &'a serde_json::Value,
    pub next_step_description: &'a str,
}

#[async_trait]
pub trait ReasoningCapability: Send + Sync {
    /// Decompose the user's request into an ordered plan.
    async fn plan(&self, user_prompt: &str) -> Result<Plan, CapabilityError>;

    /// Produce the HTTP request for one `api_call` step.
    async fn action_details(
        &self,
        request: ActionRequest<'_>,
    ) -> Result<ActionDetails, CapabilityError>;

    /// Produce the raw extraction output, expected to be `{"data": {...}}`.
    /// Parsing is left to the caller, which treats bad output as non-fatal.
    async fn extraction(&self, request: ExtractionRequest<'_>) -> Result<String, CapabilityError>;
}

/// Strip a Markdown code fence (```` ```json ```` or bare ```` ``` ````) that wraps
/// the whole reply. Backticks anywhere else are content and are left alone.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the info string (e.g. `json`), which ends the opening line or, for a
    // single-line reply, runs up to the first non-alphanumeric character.
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Reasoning capability backed by a chat model over HTTP.
pub struct LlmReasoner {
    caller: AgentCaller,
    config: AgentCallConfig,
}

impl LlmReasoner {
    pub fn new(config: AgentCallConfig) -> Self {
        Self {
            caller: AgentCaller::new(),
            config,
        }
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, CapabilityError> {
        let response = self
            .caller
            .call(&self.config, system_prompt, user_message, true)
            .await
            .map_err(CapabilityError::Request)?;

        if !response.success {
            return Err(CapabilityError::Model(
                response.error.unwrap_or_else(|| "unknown model error".to_string()),
            ));
        }

        if let Some(usage) = &response.usage {
            tracing::debug!(
                model = %response.model,
                input_tokens = ?usage.input_tokens,
                output_tokens = ?usage.output_tokens,
                "[Reasoner] Model call completed"
            );
        }

        Ok(response.content)
    }

    async fn structured<T: DeserializeOwned>(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<T, CapabilityError> {
        let content = self.complete(system_prompt, user_message).await?;
        parse_structured(&content)
    }
}

/// Decode a model reply into `T`, tolerating a surrounding code fence.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T, CapabilityError> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|e| CapabilityError::Schema(e.to_string()))
}

#[async_trait]
impl ReasoningCapability for LlmReasoner {
    async fn plan(&self, user_prompt: &str) -> Result<Plan, CapabilityError> {
        self.structured(
            prompts::WORKFLOW_PLAN_SYSTEM_PROMPT,
            &prompts::plan_message(user_prompt),
        )
        .await
    }

    async fn action_details(
        &self,
        request: ActionRequest<'_>,
    ) -> Result<ActionDetails, CapabilityError> {
        self.structured(
            prompts::API_CALL_SYSTEM_PROMPT,
            &prompts::action_message(
                request.user_prompt,
                request.step_description,
                request.extracted_data,
            ),
        )
        .await
    }

    async fn extraction(&self, request: ExtractionRequest<'_>) -> Result<String, CapabilityError> {
        self.complete(
            prompts::EXTRACT_DATA_SYSTEM_PROMPT,
            &prompts::extraction_message(request.api_response, request.next_step_description),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::agent_caller::LlmProvider;
    use crate::workflow::schema::{ActionType, HttpMethod};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json {\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_backticks_inside_unfenced_json_are_content() {
        let raw = r#"{"url": "https://api.github.com/repos/o/r/issues", "method": "POST", "body": {"body": "Repro:\n```\ncargo run\n```"}}"#;
        assert_eq!(strip_code_fence(raw), raw);

        let details = parse_structured::<ActionDetails>(raw).unwrap();
        assert_eq!(details.method, HttpMethod::Post);
        assert_eq!(
            details.body.unwrap()["body"],
            "Repro:\n```\ncargo run\n```"
        );
    }

    #[test]
    fn test_fenced_reply_keeps_inner_backticks() {
        let raw = "```json\n{\"snippet\": \"use ```rust``` blocks\"}\n```";
        assert_eq!(strip_code_fence(raw), "{\"snippet\": \"use ```rust``` blocks\"}");
    }

    #[test]
    fn test_parse_structured_schema_violation() {
        let err = parse_structured::<Plan>(r#"{"steps": "not a list"}"#).unwrap_err();
        assert!(matches!(err, CapabilityError::Schema(_)));
    }

    async fn reasoner_replying(reply: &str) -> (MockServer, LlmReasoner) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "role": "assistant", "content": reply } } ]
            })))
            .mount(&server)
            .await;

        let config = AgentCallConfig {
            provider: LlmProvider::OpenAi,
            base_url: server.uri(),
            api_key: "k".to_string(),
            ..AgentCallConfig::default()
        };
        (server, LlmReasoner::new(config))
    }

    #[tokio::test]
    async fn test_llm_reasoner_plan() {
        let (_server, reasoner) = reasoner_replying(
            "```json\n{\"steps\": [{\"description\": \"List users\", \"action_type\": \"api_call\"}]}\n```",
        )
        .await;

        let plan = reasoner.plan("List all users please").await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].action_type, ActionType::ApiCall);
    }

    #[tokio::test]
    async fn test_llm_reasoner_action_details() {
        let (_server, reasoner) =
            reasoner_replying(r#"{"url": "https://api.example.com/users", "method": "GET"}"#).await;

        let data = ExtractedData::new();
        let details = reasoner
            .action_details(ActionRequest {
                user_prompt: "List users",
                step_description: "List users",
                extracted_data: &data,
            })
            .await
            .unwrap();
        assert_eq!(details.method, HttpMethod::Get);
        assert_eq!(details.url, "https://api.example.com/users");
    }

    #[tokio::test]
    async fn test_llm_reasoner_rejects_malformed_action() {
        let (_server, reasoner) = reasoner_replying("I cannot help with that.").await;

        let data = ExtractedData::new();
        let err = reasoner
            .action_details(ActionRequest {
                user_prompt: "x",
                step_description: "y",
                extracted_data: &data,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Schema(_)));
    }
}
