//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses the
//! apiflow-core engine.

pub mod server;
pub mod workflow;
