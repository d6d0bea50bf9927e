/*!
 * API Types
 * Request and response bodies of the HTTP surface
 */

use crate::core::serde::is_none;
use crate::core::{SupervisorConfig, SupervisorError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// API operation result
pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from a handler, rendered as `{success: false, error}`
#[derive(Debug, Clone)]
pub struct ApiError(pub SupervisorError);

impl ApiError {
    /// 404 for unknown units, 500 for everything else
    pub fn status(&self) -> StatusCode {
        if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        ApiError(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(ActionResponse::failure(&self.0))).into_response()
    }
}

/// Body of `POST /api/host-bot`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// Body of `POST /api/stop-bot` and `POST /api/restart-bot`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRequest {
    pub bot_id: String,
}

/// Uniform `{success, message | error, botId?}` envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "is_none")]
    pub bot_id: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            bot_id: None,
        }
    }

    #[must_use]
    pub fn with_bot_id(mut self, id: impl Into<String>) -> Self {
        self.bot_id = Some(id.into());
        self
    }

    pub fn failure(err: &SupervisorError) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(err.to_string()),
            bot_id: None,
        }
    }
}

/// Body of `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub units: usize,
    pub version: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub max_body_bytes: usize,
}

impl From<&SupervisorConfig> for ServerConfig {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            address: config.bind_addr,
            max_body_bytes: config.max_body_bytes,
        }
    }
}
