/*!
 * Registry Types
 * Read models returned to the API layer
 */

use crate::core::serde::is_none;
use crate::core::Timestamp;
use crate::process::UnitState;
use serde::Serialize;

/// One entry of `list()`: identity, state and formatted log snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub id: String,
    pub name: String,
    pub status: UnitState,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
    pub logs: Vec<String>,
}

/// Single-unit view with process details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDetail {
    #[serde(flatten)]
    pub summary: UnitSummary,
    #[serde(skip_serializing_if = "is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "is_none")]
    pub pid: Option<u32>,
    pub restart_pending: bool,
}
