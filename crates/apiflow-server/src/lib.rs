//! ApiFlow Server - HTTP front end for the workflow engine
//!
//! Exposes the `apiflow-core` engine over HTTP:
//! - `POST /api/v1/workflow/execute-stream` streams a run as Server-Sent Events
//! - `POST /api/v1/workflow/validate` checks a prompt without running it
//! - health endpoints for probes
//!
//! This crate can be used standalone (see `apiflow server`) or embedded in
//! another binary through [`start_server_with_state`].

pub mod api;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use apiflow_core::{Settings, WorkflowExecutor};
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use self::state::{AppState, AppStateInner};

/// Configuration for the ApiFlow HTTP server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Create a shared `AppState` backed by the configured LLM.
pub fn create_app_state(settings: Settings) -> AppState {
    let executor = WorkflowExecutor::from_settings(&settings);
    Arc::new(AppStateInner::new(executor, settings))
}

/// Load settings from the environment and start the server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // No-op when the embedding binary already installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apiflow_core=info,apiflow_server=info,tower_http=info".into()),
        )
        .try_init();

    tracing::info!(
        "Starting ApiFlow server on {}:{}",
        config.host,
        config.port
    );

    let settings = Settings::from_env().map_err(|e| e.to_string())?;
    tracing::info!(
        "[Config] LLM provider: {}, model: {}",
        settings.llm.provider.as_str(),
        settings.llm.model
    );

    start_server_with_state(config, create_app_state(settings)).await
}

/// Start the HTTP server with a pre-built `AppState`.
///
/// Useful for tests and embedders that bring their own reasoning or
/// dispatch collaborators.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let cors = cors_layer(&state.settings.cors_origin)?;

    let app = Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("ApiFlow server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

fn cors_layer(origin: &str) -> Result<CorsLayer, String> {
    let allow_origin = if origin == "*" {
        AllowOrigin::from(Any)
    } else {
        let value = HeaderValue::from_str(origin)
            .map_err(|e| format!("Invalid CORS origin {:?}: {}", origin, e))?;
        AllowOrigin::exact(value)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "apiflow-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
