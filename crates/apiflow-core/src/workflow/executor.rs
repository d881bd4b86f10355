//! Workflow Executor — the state machine that runs a plan step by step.
//!
//! ```text
//!  PLANNING ──► route ──┬──► DISPATCH_API ─────┐
//!                       ├──► DISPATCH_EXTRACT ─┤
//!                       └──► DONE              ▼
//!                   ▲                      INCREMENT
//!                   └──────── route ◄──────────┘
//!
//!  any stage that sets an error ──► HALTED
//! ```
//!
//! The executor:
//! 1. Asks the reasoning capability for a plan
//! 2. Routes on the current step's action type
//! 3. Dispatches API calls / extracts data, threading extracted values
//!    into later requests via placeholder substitution
//! 4. Emits a progress event after each stage and always closes with `end`

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::{Settings, DEFAULT_DISPATCH_TIMEOUT_SECS};
use crate::error::WorkflowError;
use crate::events::{EventSink, ExtractionDetails, StepResponse, StreamClosed, WorkflowEvent};
use crate::workflow::dispatcher::{HttpDispatcher, ReqwestDispatcher};
use crate::workflow::extraction::{extract_data, skip_reason};
use crate::workflow::planner::generate_plan;
use crate::workflow::reasoning::{LlmReasoner, ReasoningCapability};
use crate::workflow::schema::{ActionType, DispatchFailurePolicy, RequestHistoryEntry};
use crate::workflow::state::RunState;
use crate::workflow::step_executor::execute_api_step;

/// Events buffered between the run task and a slow consumer.
const EVENT_BUFFER: usize = 32;

/// Machine states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    DispatchApi,
    DispatchExtract,
    Increment,
    Done,
    Halted,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Halted)
    }
}

/// Where the router sends the run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ApiCall,
    DataExtraction,
    Done,
}

impl Route {
    fn stage(self) -> Stage {
        match self {
            Route::ApiCall => Stage::DispatchApi,
            Route::DataExtraction => Stage::DispatchExtract,
            Route::Done => Stage::Done,
        }
    }
}

/// Pick the next dispatch target from the current step's action type.
pub fn route_action(state: &RunState) -> Route {
    match state.current_step() {
        None => Route::Done,
        Some(step) => match step.action_type {
            ActionType::ApiCall => Route::ApiCall,
            ActionType::DataExtraction => Route::DataExtraction,
        },
    }
}

/// Transition table. `state` reflects the effects of `stage` having run.
pub fn next_stage(stage: Stage, state: &RunState) -> Stage {
    if stage.is_terminal() {
        return stage;
    }
    if state.is_halted() {
        return Stage::Halted;
    }
    match stage {
        Stage::Planning | Stage::Increment => route_action(state).stage(),
        Stage::DispatchApi | Stage::DispatchExtract => Stage::Increment,
        Stage::Done | Stage::Halted => stage,
    }
}

/// Runs workflows. Cheap to clone; every run gets its own [`RunState`].
#[derive(Clone)]
pub struct WorkflowExecutor {
    reasoner: Arc<dyn ReasoningCapability>,
    dispatcher: Arc<dyn HttpDispatcher>,
    dispatch_timeout: Duration,
    failure_policy: DispatchFailurePolicy,
}

impl WorkflowExecutor {
    pub fn new(reasoner: Arc<dyn ReasoningCapability>, dispatcher: Arc<dyn HttpDispatcher>) -> Self {
        Self {
            reasoner,
            dispatcher,
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            failure_policy: DispatchFailurePolicy::default(),
        }
    }

    /// Executor backed by the configured LLM and a reqwest dispatcher.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(LlmReasoner::new(settings.llm.clone())),
            Arc::new(ReqwestDispatcher::new()),
        )
        .with_dispatch_timeout(settings.dispatch_timeout)
        .with_failure_policy(settings.dispatch_failure_policy)
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: DispatchFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Start a run in the background and return its event stream.
    ///
    /// Dropping the stream cancels the run: no further external calls are
    /// issued once the consumer is gone.
    pub fn stream(&self, user_prompt: impl Into<String>) -> ReceiverStream<WorkflowEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let executor = self.clone();
        let user_prompt = user_prompt.into();
        tokio::spawn(async move {
            executor.run_to_channel(user_prompt, tx).await;
        });
        ReceiverStream::new(rx)
    }

    /// Run to completion, pushing events into `tx`. Always ends with `end`
    /// unless the consumer disconnected.
    pub async fn run_to_channel(&self, user_prompt: String, tx: mpsc::Sender<WorkflowEvent>) {
        let sink = EventSink::new(tx);
        let run_sink = sink.clone();
        let executor = self.clone();

        // A separate task so that a panic anywhere in the run is still
        // reported on the stream.
        let handle = tokio::spawn(async move { executor.execute(user_prompt, &run_sink).await });

        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(StreamClosed)) => {
                tracing::info!("[Workflow] Consumer disconnected, run cancelled");
                return;
            }
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                tracing::error!("[Workflow] Run task failed: {}", message);
                let detail = WorkflowError::Unexpected(message).to_string();
                if sink.emit(WorkflowEvent::error(detail)).await.is_err() {
                    return;
                }
            }
        }

        let _ = sink.emit(WorkflowEvent::end()).await;
    }

    /// Drive the state machine for one prompt. Emits every event except `end`.
    ///
    /// Returns the final run state, or `StreamClosed` if the consumer went away.
    pub async fn execute(&self, user_prompt: String, sink: &EventSink) -> Result<RunState, StreamClosed> {
        let mut state = RunState::new(user_prompt);
        tracing::info!(run_id = %state.run_id, "[Workflow] Starting run");

        let mut stage = Stage::Planning;
        loop {
            match stage {
                Stage::Planning => self.plan_stage(&mut state, sink).await?,
                Stage::DispatchApi => self.api_stage(&mut state, sink).await?,
                Stage::DispatchExtract => self.extract_stage(&mut state, sink).await?,
                Stage::Increment => state.step_index += 1,
                Stage::Done => {
                    tracing::info!(
                        run_id = %state.run_id,
                        "[Workflow] Completed {} step(s)",
                        state.plan.len()
                    );
                    break;
                }
                Stage::Halted => {
                    let detail = state
                        .error
                        .as_ref()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    tracing::warn!(run_id = %state.run_id, "[Workflow] Halted: {}", detail);
                    sink.emit(WorkflowEvent::error(detail)).await?;
                    break;
                }
            }
            stage = next_stage(stage, &state);
        }

        Ok(state)
    }

    async fn plan_stage(&self, state: &mut RunState, sink: &EventSink) -> Result<(), StreamClosed> {
        ensure_open(sink)?;
        tracing::info!(run_id = %state.run_id, "[Workflow] PLANNING");

        match generate_plan(self.reasoner.as_ref(), &state.user_prompt).await {
            Ok(plan) => {
                state.plan = plan;
                sink.emit(WorkflowEvent::PlanCreated(state.plan.clone())).await
            }
            Err(e) => {
                state.error = Some(e);
                Ok(())
            }
        }
    }

    async fn api_stage(&self, state: &mut RunState, sink: &EventSink) -> Result<(), StreamClosed> {
        ensure_open(sink)?;
        let step_index = state.step_index;
        let Some(step) = state.current_step().cloned() else {
            return Ok(());
        };
        tracing::info!(
            run_id = %state.run_id,
            "[Workflow] Executing step {}: {}",
            step_index,
            step.description
        );

        let outcome = match execute_api_step(
            self.reasoner.as_ref(),
            self.dispatcher.as_ref(),
            self.dispatch_timeout,
            &step.description,
            &state.user_prompt,
            &state.extracted_data,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                state.error = Some(e);
                return Ok(());
            }
        };

        state.request_history.push(RequestHistoryEntry {
            step_index,
            action_details: outcome.action_details.clone(),
            response_data: outcome.response_data.clone(),
            error: outcome.error.as_ref().map(|e| e.to_string()),
            timestamp: Utc::now(),
        });

        match outcome.error {
            None => state.current_response = Some(outcome.response_data.clone()),
            Some(e) => match self.failure_policy {
                DispatchFailurePolicy::Halt => {
                    state.current_response = Some(outcome.response_data.clone());
                    state.error = Some(e);
                }
                DispatchFailurePolicy::Continue => {
                    tracing::warn!(
                        run_id = %state.run_id,
                        "[Workflow] Step {} failed, continuing: {}",
                        step_index,
                        e
                    );
                    state.current_response = None;
                }
            },
        }

        sink.emit(WorkflowEvent::ApiCallCompleted(StepResponse {
            step_title: format!("Step {}: {}", step_index + 1, step.description),
            request_details: outcome.action_details,
            response_details: outcome.response_data,
            extracted_data: None,
        }))
        .await
    }

    async fn extract_stage(&self, state: &mut RunState, sink: &EventSink) -> Result<(), StreamClosed> {
        if let Some(reason) = skip_reason(state) {
            tracing::warn!(
                run_id = %state.run_id,
                "[Workflow] Skipping data extraction at step {}: {:?}",
                state.step_index,
                reason
            );
            return Ok(());
        }
        ensure_open(sink)?;

        let next_description = state
            .next_step()
            .map(|s| s.description.clone())
            .unwrap_or_default();
        let response = state.current_response.clone().unwrap_or_default();

        match extract_data(self.reasoner.as_ref(), &response, &next_description).await {
            Ok(bundle) => {
                tracing::info!(
                    run_id = %state.run_id,
                    "[Workflow] Extracted keys: {:?}",
                    bundle.keys().collect::<Vec<_>>()
                );
                state.merge_extracted(bundle);
            }
            Err(e) => {
                tracing::error!(
                    run_id = %state.run_id,
                    "[Workflow] LLM failed during data extraction or parsing: {}",
                    e
                );
            }
        }

        // A response exists, so some step ran before this one.
        let after = state
            .previous_step()
            .map(|s| s.description.clone())
            .unwrap_or_default();

        sink.emit(WorkflowEvent::DataExtracted(ExtractionDetails {
            step_title: format!("Data Extraction after: {}", after),
            extracted_data: state.extracted_data.clone(),
        }))
        .await
    }
}

fn ensure_open(sink: &EventSink) -> Result<(), StreamClosed> {
    if sink.is_closed() {
        Err(StreamClosed)
    } else {
        Ok(())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "run task panicked".to_string()
    }
}
