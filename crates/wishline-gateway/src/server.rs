//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use wishline_core::error::{Result, WishlineError};
use wishline_scheduler::ReminderScheduler;
use wishline_store::ReminderStore;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ReminderStore>,
    pub scheduler: Arc<ReminderScheduler>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/api/health", get(super::routes::health))
        .route("/api/reminders/run", post(super::routes::run_reminders))
        .route("/api/reminders/logs", get(super::routes::recent_logs))
        .route(
            "/api/reminders/logs/{date}",
            get(super::routes::logs_for_date),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Bind and serve until shutdown.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WishlineError::Http(format!("bind {addr}: {e}")))?;
    tracing::info!("Gateway listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| WishlineError::Http(e.to_string()))
}
