//! Plan generation.

use crate::error::WorkflowError;
use crate::workflow::reasoning::ReasoningCapability;
use crate::workflow::schema::Plan;

/// Ask the reasoning capability to break `user_prompt` into ordered steps.
///
/// Any capability failure is a [`WorkflowError::Planning`], fatal for the run.
pub async fn generate_plan(
    reasoner: &dyn ReasoningCapability,
    user_prompt: &str,
) -> Result<Plan, WorkflowError> {
    let plan = reasoner.plan(user_prompt).await.map_err(|e| {
        tracing::error!("[Planner] Failed to generate plan: {}", e);
        WorkflowError::Planning(e.to_string())
    })?;

    if plan.is_empty() {
        tracing::warn!("[Planner] Model returned an empty plan");
    } else {
        for (i, step) in plan.steps.iter().enumerate() {
            tracing::info!(
                "[Planner] Step {}: [{}] {}",
                i + 1,
                step.action_type.as_str(),
                step.description
            );
        }
    }

    Ok(plan)
}
