pub mod test;
pub mod workflow;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1/workflow", workflow::router())
        .nest("/api/v1/test", test::router())
}
