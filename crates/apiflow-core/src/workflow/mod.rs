//! Workflow engine — plan-driven multi-step API orchestration.
//!
//! A natural-language request is planned by an LLM into typed steps, then
//! executed one step at a time. Values extracted from one response are fed
//! into later requests through `{placeholder}` substitution.
//!
//! # Architecture
//!
//! ```text
//! user prompt ──► planner ──► Plan ──► WorkflowExecutor (state machine)
//!                                          │            │
//!                               step_executor      extraction
//!                                │        │             │
//!                     ReasoningCapability  HttpDispatcher
//!                        (LlmReasoner)    (ReqwestDispatcher)
//! ```

pub mod agent_caller;
pub mod dispatcher;
pub mod executor;
pub mod extraction;
pub mod planner;
pub mod prompts;
pub mod reasoning;
pub mod schema;
pub mod state;
pub mod step_executor;
pub mod template;
pub mod validation;

pub use agent_caller::{AgentCallConfig, AgentCaller, LlmProvider};
pub use dispatcher::{DispatchError, DispatchRequest, DispatchResponse, HttpDispatcher, ReqwestDispatcher};
pub use executor::{next_stage, route_action, Route, Stage, WorkflowExecutor};
pub use reasoning::{ActionRequest, CapabilityError, ExtractionRequest, LlmReasoner, ReasoningCapability};
pub use schema::{
    ActionDetails, ActionType, DispatchFailurePolicy, ExtractedData, HttpMethod, Plan, PlanStep,
    RequestHistoryEntry,
};
pub use state::RunState;
pub use template::substitute;
pub use validation::{validate_prompt, PromptValidation};
