//! Process-wide settings, constructed once at startup.
//!
//! Settings are read from the environment (optionally seeded from
//! `.env.local` / `.env`) and then passed explicitly into the reasoning and
//! dispatch collaborators. Nothing in the engine reads the environment
//! mid-run.

use std::path::Path;
use std::time::Duration;

use crate::error::ServerError;
use crate::workflow::agent_caller::{AgentCallConfig, LlmProvider};
use crate::workflow::schema::DispatchFailurePolicy;

/// Default ceiling for every outbound workflow HTTP call.
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Default sampling temperature for all reasoning calls.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Settings {
    /// How to reach the reasoning model.
    pub llm: AgentCallConfig,
    /// Allowed CORS origin for the HTTP server (`*` for any).
    pub cors_origin: String,
    /// Hard timeout for each dispatched workflow request.
    pub dispatch_timeout: Duration,
    /// What a failed dispatch does to the rest of the run.
    pub dispatch_failure_policy: DispatchFailurePolicy,
}

impl Settings {
    /// Load `.env.local` / `.env` from the working directory, then build
    /// settings from the process environment.
    pub fn from_env() -> Result<Self, ServerError> {
        load_dotenv(Path::new("."));
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("LLM_PROVIDER") {
            Some(name) => LlmProvider::parse(&name)
                .ok_or_else(|| ServerError::Config(format!("Unknown LLM_PROVIDER '{}'", name)))?,
            None => LlmProvider::Gemini,
        };

        let api_key = get("LLM_API_KEY")
            .or_else(|| get(provider.api_key_var()))
            .ok_or_else(|| {
                ServerError::Config(format!(
                    "No API key found. Set LLM_API_KEY or {}.",
                    provider.api_key_var()
                ))
            })?;

        let temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|e| {
                ServerError::Config(format!("Invalid LLM_TEMPERATURE '{}': {}", raw, e))
            })?,
            None => DEFAULT_TEMPERATURE,
        };

        let dispatch_timeout_secs = match get("DISPATCH_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ServerError::Config(format!("Invalid DISPATCH_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => DEFAULT_DISPATCH_TIMEOUT_SECS,
        };
        if dispatch_timeout_secs == 0 {
            return Err(ServerError::Config(
                "DISPATCH_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let dispatch_failure_policy = match get("DISPATCH_FAILURE_POLICY") {
            Some(raw) => DispatchFailurePolicy::parse(&raw).ok_or_else(|| {
                ServerError::Config(format!(
                    "Invalid DISPATCH_FAILURE_POLICY '{}' (expected 'halt' or 'continue')",
                    raw
                ))
            })?,
            None => DispatchFailurePolicy::default(),
        };

        let llm = AgentCallConfig {
            base_url: get("LLM_BASE_URL").unwrap_or_else(|| provider.default_base_url().to_string()),
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            provider,
            api_key,
            temperature: Some(temperature),
            ..AgentCallConfig::default()
        };

        Ok(Self {
            llm,
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "*".to_string()),
            dispatch_timeout: Duration::from_secs(dispatch_timeout_secs),
            dispatch_failure_policy,
        })
    }
}

/// Load `.env.local` and `.env` from `dir`.
///
/// `.env.local` is read first so it wins; variables already present in the
/// process environment are never overwritten.
pub fn load_dotenv(dir: &Path) {
    for filename in [".env.local", ".env"] {
        let path = dir.join(filename);
        if !path.exists() {
            continue;
        }
        match dotenvy::from_path(&path) {
            Ok(()) => tracing::info!("[Config] Loaded environment from '{}'", path.display()),
            Err(e) => tracing::warn!("[Config] Failed to load '{}': {}", path.display(), e),
        }
    }
}
