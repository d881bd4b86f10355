//! ApiFlow Core — Transport-agnostic workflow engine.
//!
//! Turns a natural-language request into an ordered sequence of HTTP API
//! calls. An LLM plans the steps, synthesizes each request and extracts
//! data from responses for later steps. The engine has **no HTTP framework
//! dependency** by default, making it suitable for use in:
//!
//! - HTTP servers (via `apiflow-server`)
//! - CLI tools (via `apiflow-cli`)
//! - Tests, with fake reasoning and dispatch collaborators
//!
//! # Feature Flags
//!
//! - `axum` — Enables `IntoResponse` impl on `ServerError` for use in axum handlers.

pub mod config;
pub mod error;
pub mod events;
pub mod workflow;

// Convenience re-exports
pub use config::Settings;
pub use error::{ServerError, WorkflowError};
pub use events::WorkflowEvent;
pub use workflow::WorkflowExecutor;
