//! Agent Caller — invokes a chat model via its HTTP API.
//!
//! The workflow engine talks to the LLM directly over HTTP. Three wire
//! formats are supported: Gemini `generateContent`, the Anthropic Messages
//! API and OpenAI-compatible chat completions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which wire format to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl LlmProvider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "openai-compatible" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    /// Provider-specific environment variable holding the API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::Anthropic => "https://api.anthropic.com",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash-8b",
            Self::Anthropic => "claude-3-5-haiku-latest",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

/// Configuration for calling a chat model via HTTP API.
#[derive(Debug, Clone)]
pub struct AgentCallConfig {
    pub provider: LlmProvider,
    /// API base URL
    pub base_url: String,
    /// API key / auth token
    pub api_key: String,
    /// Model ID
    pub model: String,
    /// Temperature
    pub temperature: Option<f64>,
    /// Maximum tokens for the response
    pub max_tokens: u32,
    /// Ceiling for a single model call
    pub timeout: Duration,
}

impl Default for AgentCallConfig {
    fn default() -> Self {
        let provider = LlmProvider::default();
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            api_key: String::new(),
            model: provider.default_model().to_string(),
            temperature: Some(0.1),
            max_tokens: 8192,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Response from a model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// The model's text response
    pub content: String,
    /// Model used
    pub model: String,
    /// Usage statistics
    pub usage: Option<UsageInfo>,
    /// Whether the call succeeded
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Calls a chat model via HTTP API.
pub struct AgentCaller {
    client: reqwest::Client,
}

impl Default for AgentCaller {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentCaller {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Send one system prompt + one user message and return the text reply.
    ///
    /// `json_output` asks providers that support it to constrain the reply to JSON.
    pub async fn call(
        &self,
        config: &AgentCallConfig,
        system_prompt: &str,
        user_message: &str,
        json_output: bool,
    ) -> Result<AgentResponse, String> {
        match config.provider {
            LlmProvider::Gemini => {
                self.call_gemini(config, system_prompt, user_message, json_output)
                    .await
            }
            LlmProvider::Anthropic => {
                self.call_anthropic(config, system_prompt, user_message).await
            }
            LlmProvider::OpenAi => {
                self.call_openai_compatible(config, system_prompt, user_message, json_output)
                    .await
            }
        }
    }

    /// POST {base_url}/models/{model}:generateContent?key={api_key}
    async fn call_gemini(
        &self,
        config: &AgentCallConfig,
        system_prompt: &str,
        user_message: &str,
        json_output: bool,
    ) -> Result<AgentResponse, String> {
        let url = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        let mut generation_config = serde_json::json!({
            "maxOutputTokens": config.max_tokens,
        });
        if let Some(temp) = config.temperature {
            generation_config["temperature"] = number(temp);
        }
        if json_output {
            generation_config["responseMimeType"] =
                serde_json::Value::String("application/json".to_string());
        }

        let mut body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": user_message } ] }
            ],
            "generationConfig": generation_config,
        });
        if !system_prompt.is_empty() {
            body["systemInstruction"] = serde_json::json!({ "parts": [ { "text": system_prompt } ] });
        }

        tracing::info!("[AgentCaller] Calling Gemini API: {} (model: {})", url, config.model);

        let request = self
            .client
            .post(&url)
            .query(&[("key", config.api_key.as_str())])
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&body);

        let json = match self.send(config, request).await? {
            Some(Ok(json)) => json,
            Some(Err(failure)) => return Ok(failure),
            None => return Ok(failed(config, "empty response")),
        };

        let content = json
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|candidate| candidate.pointer("/content/parts"))
            .and_then(|parts| parts.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = json.get("usageMetadata").map(|u| UsageInfo {
            input_tokens: u.get("promptTokenCount").and_then(|v| v.as_u64()),
            output_tokens: u.get("candidatesTokenCount").and_then(|v| v.as_u64()),
        });

        Ok(succeeded(config, content, usage, &json))
    }

    /// POST {base_url}/v1/messages
    async fn call_anthropic(
        &self,
        config: &AgentCallConfig,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<AgentResponse, String> {
        let url = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "messages": [
                { "role": "user", "content": user_message }
            ]
        });
        if !system_prompt.is_empty() {
            body["system"] = serde_json::Value::String(system_prompt.to_string());
        }
        if let Some(temp) = config.temperature {
            body["temperature"] = number(temp);
        }

        tracing::info!("[AgentCaller] Calling Anthropic API: {} (model: {})", url, config.model);

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&body);

        let json = match self.send(config, request).await? {
            Some(Ok(json)) => json,
            Some(Err(failure)) => return Ok(failure),
            None => return Ok(failed(config, "empty response")),
        };

        let content = json
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|arr| {
                arr.iter()
                    .filter_map(|block| {
                        if block.get("type").and_then(|t| t.as_str()) == Some("text") {
                            block.get("text").and_then(|t| t.as_str()).map(|s| s.to_string())
                        } else {
                            None
                        }
                    })
                    .reduce(|a, b| format!("{}\n{}", a, b))
            })
            .unwrap_or_default();

        let usage = json.get("usage").map(|u| UsageInfo {
            input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()),
            output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()),
        });

        Ok(succeeded(config, content, usage, &json))
    }

    /// POST {base_url}/chat/completions
    async fn call_openai_compatible(
        &self,
        config: &AgentCallConfig,
        system_prompt: &str,
        user_message: &str,
        json_output: bool,
    ) -> Result<AgentResponse, String> {
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        let mut messages = vec![];
        if !system_prompt.is_empty() {
            messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": user_message }));

        let mut body = serde_json::json!({
            "model": config.model,
            "messages": messages,
            "max_tokens": config.max_tokens,
        });
        if let Some(temp) = config.temperature {
            body["temperature"] = number(temp);
        }
        if json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        tracing::info!("[AgentCaller] Calling OpenAI-compatible API: {} (model: {})", url, config.model);

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&body);

        let json = match self.send(config, request).await? {
            Some(Ok(json)) => json,
            Some(Err(failure)) => return Ok(failure),
            None => return Ok(failed(config, "empty response")),
        };

        let content = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string();

        let usage = json.get("usage").map(|u| UsageInfo {
            input_tokens: u
                .get("prompt_tokens")
                .or_else(|| u.get("input_tokens"))
                .and_then(|v| v.as_u64()),
            output_tokens: u
                .get("completion_tokens")
                .or_else(|| u.get("output_tokens"))
                .and_then(|v| v.as_u64()),
        });

        Ok(succeeded(config, content, usage, &json))
    }

    /// Send the request and decode the JSON body.
    ///
    /// Transport failures are `Err`; a non-2xx answer is `Some(Err(failed response))`;
    /// an empty body is `None`.
    async fn send(
        &self,
        config: &AgentCallConfig,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<Result<serde_json::Value, AgentResponse>>, String> {
        let response = request
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response body: {}", e))?;

        if !status.is_success() {
            return Ok(Some(Err(failed(
                config,
                &format!("API returned {}: {}", status, response_text),
            ))));
        }

        if response_text.trim().is_empty() {
            return Ok(None);
        }

        let json: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| format!("Failed to parse response JSON: {}", e))?;
        Ok(Some(Ok(json)))
    }
}

fn number(value: f64) -> serde_json::Value {
    serde_json::Value::Number(
        serde_json::Number::from_f64(value).unwrap_or_else(|| serde_json::Number::from(0)),
    )
}

fn succeeded(
    config: &AgentCallConfig,
    content: String,
    usage: Option<UsageInfo>,
    json: &serde_json::Value,
) -> AgentResponse {
    let model = json
        .get("model")
        .or_else(|| json.get("modelVersion"))
        .and_then(|m| m.as_str())
        .unwrap_or(&config.model)
        .to_string();

    AgentResponse {
        content,
        model,
        usage,
        success: true,
        error: None,
    }
}

fn failed(config: &AgentCallConfig, error: &str) -> AgentResponse {
    AgentResponse {
        content: String::new(),
        model: config.model.clone(),
        usage: None,
        success: false,
        error: Some(error.to_string()),
    }
}
