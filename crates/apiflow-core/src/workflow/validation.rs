//! Up-front checks on a user prompt before a run is started.

use serde::Serialize;

/// Minimum number of non-whitespace-trimmed characters a prompt must have.
pub const MIN_PROMPT_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PromptValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            message: Some("Prompt is valid".to_string()),
            error: None,
        }
    }

    fn rejected(error: &str) -> Self {
        Self {
            valid: false,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

pub fn validate_prompt(prompt: &str) -> PromptValidation {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return PromptValidation::rejected("Prompt cannot be empty");
    }
    if trimmed.chars().count() < MIN_PROMPT_LEN {
        return PromptValidation::rejected(
            "Prompt is too short. Please provide more detailed instructions.",
        );
    }
    PromptValidation::ok()
}
