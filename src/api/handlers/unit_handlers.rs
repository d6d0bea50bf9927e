/*!
 * Unit lifecycle HTTP handler implementations
 */

use crate::api::types::{
    ActionResponse, ApiError, ApiResult, CreateRequest, HealthResponse, UnitRequest,
};
use crate::api::AppState;
use crate::core::{SupervisorError, SupervisorResult};
use crate::registry::{UnitDetail, UnitSummary};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Unwrap a JSON body, reporting malformed input in the standard envelope
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError(SupervisorError::InvalidRequest(rejection.body_text())))
}

/// Run registry work that touches the filesystem off the async workers
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> SupervisorResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError(SupervisorError::Internal(format!("registry task failed: {}", e))))?
        .map_err(ApiError::from)
}

#[instrument(skip_all, fields(bot_id))]
pub async fn handle_create(
    State(state): State<AppState>,
    payload: Result<Json<CreateRequest>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let req = body(payload)?;
    info!(name = %req.name, bytes = req.code.len(), "HTTP: hosting unit");

    let registry = Arc::clone(&state.registry);
    let id = blocking(move || registry.create(&req.name, &req.code, req.bot_id.as_deref())).await?;
    tracing::Span::current().record("bot_id", id.as_str());

    Ok(Json(ActionResponse::ok("unit hosted").with_bot_id(id.to_string())))
}

#[instrument(skip_all)]
pub async fn handle_stop(
    State(state): State<AppState>,
    payload: Result<Json<UnitRequest>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let req = body(payload)?;
    let message = if state.registry.stop(&req.bot_id)? {
        "unit stopped"
    } else {
        "unit was not running"
    };
    Ok(Json(ActionResponse::ok(message)))
}

#[instrument(skip_all)]
pub async fn handle_restart(
    State(state): State<AppState>,
    payload: Result<Json<UnitRequest>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let req = body(payload)?;
    state.registry.restart(&req.bot_id)?;
    Ok(Json(ActionResponse::ok("unit restarting")))
}

pub async fn handle_list(State(state): State<AppState>) -> Json<Vec<UnitSummary>> {
    Json(state.registry.list())
}

pub async fn handle_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Vec<String>> {
    Json(state.registry.logs(&id))
}

pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UnitDetail>> {
    Ok(Json(state.registry.get(&id)?))
}

#[instrument(skip(state))]
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let registry = Arc::clone(&state.registry);
    blocking(move || registry.remove(&id)).await?;
    Ok(Json(ActionResponse::ok("unit deleted")))
}

pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        units: state.registry.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
