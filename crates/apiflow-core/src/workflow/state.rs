//! Working memory of a single workflow run.

use uuid::Uuid;

use crate::error::WorkflowError;
use crate::workflow::schema::{ExtractedData, Plan, PlanStep, RequestHistoryEntry};

/// Mutable state owned by one run. Never shared between runs.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Correlates log lines of one run
    pub run_id: String,
    pub user_prompt: String,
    pub plan: Plan,
    pub step_index: usize,
    /// Merged output of every extraction so far (last write wins)
    pub extracted_data: ExtractedData,
    pub request_history: Vec<RequestHistoryEntry>,
    /// Response of the most recent successful dispatch
    pub current_response: Option<serde_json::Value>,
    /// Set once; a set error halts the run
    pub error: Option<WorkflowError>,
}

impl RunState {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            user_prompt: user_prompt.into(),
            plan: Plan::default(),
            step_index: 0,
            extracted_data: ExtractedData::new(),
            request_history: Vec::new(),
            current_response: None,
            error: None,
        }
    }

    pub fn current_step(&self) -> Option<&PlanStep> {
        self.plan.get(self.step_index)
    }

    pub fn next_step(&self) -> Option<&PlanStep> {
        self.plan.get(self.step_index + 1)
    }

    pub fn previous_step(&self) -> Option<&PlanStep> {
        self.step_index
            .checked_sub(1)
            .and_then(|index| self.plan.get(index))
    }

    /// Whether the recorded error stops the run.
    pub fn is_halted(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.is_halting())
    }

    /// Merge a new bundle into `extracted_data`, overwriting existing keys.
    pub fn merge_extracted(&mut self, bundle: ExtractedData) {
        for (key, value) in bundle {
            self.extracted_data.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_state() {
        let state = RunState::new("do things");
        assert_eq!(state.step_index, 0);
        assert!(state.plan.is_empty());
        assert!(state.extracted_data.is_empty());
        assert!(state.request_history.is_empty());
        assert!(state.current_response.is_none());
        assert!(!state.is_halted());
        assert!(state.current_step().is_none());
    }

    #[test]
    fn test_only_halting_errors_halt() {
        let mut state = RunState::new("x");
        state.error = Some(WorkflowError::Extraction("bad json".to_string()));
        assert!(!state.is_halted());

        state.error = Some(WorkflowError::ActionSynthesis);
        assert!(state.is_halted());
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut state = RunState::new("x");
        state.extracted_data.insert("a".to_string(), json!(1));

        let mut bundle = ExtractedData::new();
        bundle.insert("a".to_string(), json!(2));
        bundle.insert("b".to_string(), json!(3));
        state.merge_extracted(bundle);

        assert_eq!(serde_json::Value::Object(state.extracted_data), json!({"a": 2, "b": 3}));
    }

    #[test]
    fn test_step_navigation() {
        let mut state = RunState::new("x");
        state.plan = Plan::new(vec![
            PlanStep::api_call("one"),
            PlanStep::data_extraction("two"),
        ]);
        assert!(state.previous_step().is_none());
        assert_eq!(state.next_step().unwrap().description, "two");

        state.step_index = 1;
        assert_eq!(state.previous_step().unwrap().description, "one");
        assert!(state.next_step().is_none());
    }
}
