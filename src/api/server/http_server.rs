/*!
 * HTTP Server
 * Routes, middleware and serving loop for the supervisor API
 */

use crate::api::handlers::unit_handlers::*;
use crate::api::types::ServerConfig;
use crate::api::AppState;
use crate::core::{SupervisorError, SupervisorResult};
use crate::registry::Registry;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the API router
pub fn router(registry: Arc<Registry>, max_body_bytes: usize) -> Router {
    let api = Router::new()
        .route("/health", get(handle_health))
        .route("/host-bot", post(handle_create))
        .route("/stop-bot", post(handle_stop))
        .route("/restart-bot", post(handle_restart))
        .route("/bots", get(handle_list))
        .route("/bot-logs/{id}", get(handle_logs))
        .route("/bot/{id}", get(handle_get).delete(handle_delete));

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { registry })
}

/// Serve the API until `shutdown` resolves
pub async fn serve<F>(
    config: ServerConfig,
    registry: Arc<Registry>,
    shutdown: F,
) -> SupervisorResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.address)
        .await
        .map_err(|e| SupervisorError::IoFailure(format!("bind {}: {}", config.address, e)))?;

    info!(addr = %config.address, "HTTP server listening");

    axum::serve(listener, router(registry, config.max_body_bytes))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SupervisorError::Internal(format!("serve {}: {}", config.address, e)))
}
