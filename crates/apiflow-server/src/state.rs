use std::sync::Arc;

use apiflow_core::{Settings, WorkflowExecutor};

/// State shared by every request handler.
pub struct AppStateInner {
    pub executor: WorkflowExecutor,
    pub settings: Settings,
}

impl AppStateInner {
    pub fn new(executor: WorkflowExecutor, settings: Settings) -> Self {
        Self { executor, settings }
    }
}

pub type AppState = Arc<AppStateInner>;
