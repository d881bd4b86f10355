//! `apiflow run` / `apiflow validate` — Execute a prompt from the terminal.

use apiflow_core::workflow::validate_prompt;
use apiflow_core::{Settings, WorkflowEvent, WorkflowExecutor};
use tokio_stream::StreamExt;

/// Longest response preview printed in human mode.
const PREVIEW_CHARS: usize = 300;

/// Run one workflow and print its events.
///
/// Fails (exit code 1) when the run reported an `error` event.
pub async fn run(prompt: &str, json: bool) -> Result<(), String> {
    validate(prompt)?;

    let settings = Settings::from_env().map_err(|e| e.to_string())?;
    tracing::info!(
        "[Config] LLM provider: {}, model: {}",
        settings.llm.provider.as_str(),
        settings.llm.model
    );
    let executor = WorkflowExecutor::from_settings(&settings);

    let mut events = executor.stream(prompt);
    let mut failure = None;

    while let Some(event) = events.next().await {
        if json {
            print!("{}", event.to_ndjson_line());
        } else {
            println!("{}", render_event(&event));
        }
        if let WorkflowEvent::Error(e) = &event {
            failure = Some(e.detail.clone());
        }
        if event.is_terminal() {
            break;
        }
    }

    match failure {
        Some(detail) => Err(format!("Workflow failed: {}", detail)),
        None => Ok(()),
    }
}

/// Check whether `prompt` would be accepted by the engine.
pub fn validate(prompt: &str) -> Result<(), String> {
    let validation = validate_prompt(prompt);
    if validation.valid {
        Ok(())
    } else {
        Err(validation.error.unwrap_or_else(|| "Invalid prompt".to_string()))
    }
}

/// Human-readable rendering of a single event.
fn render_event(event: &WorkflowEvent) -> String {
    match event {
        WorkflowEvent::PlanCreated(plan) => {
            let mut out = format!("📋 Plan with {} step(s):", plan.len());
            for (i, step) in plan.steps.iter().enumerate() {
                out.push_str(&format!(
                    "\n   {}. [{}] {}",
                    i + 1,
                    step.action_type.as_str(),
                    step.description
                ));
            }
            out
        }
        WorkflowEvent::ApiCallCompleted(step) => format!(
            "▶ {}\n   {} {}\n   → {}",
            step.step_title,
            step.request_details.method,
            step.request_details.url,
            preview(&step.response_details.to_string())
        ),
        WorkflowEvent::DataExtracted(details) => format!(
            "🔎 {}\n   {}",
            details.step_title,
            serde_json::Value::Object(details.extracted_data.clone())
        ),
        WorkflowEvent::Error(e) => format!("❌ {}", e.detail),
        WorkflowEvent::End(end) => format!("🎉 {}", end.message),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", head)
}
