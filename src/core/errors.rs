/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supervisor operation result
pub type SupervisorResult<T> = Result<T, SupervisorError>;

/// Supervisor errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SupervisorError {
    #[error("unit {0} not found")]
    #[diagnostic(
        code(supervisor::not_found),
        help("The unit may have been deleted or never existed. Check the id.")
    )]
    NotFound(String),

    #[error("failed to spawn process: {0}")]
    #[diagnostic(
        code(supervisor::spawn_failure),
        help("Check that the configured runtime is installed and executable.")
    )]
    SpawnFailure(String),

    #[error("workspace I/O failed: {0}")]
    #[diagnostic(
        code(supervisor::io_failure),
        help("Check disk space and permissions on the workspace directory.")
    )]
    IoFailure(String),

    #[error("invalid request: {0}")]
    #[diagnostic(code(supervisor::invalid_request))]
    InvalidRequest(String),

    #[error("unit {0} already exists or was used before")]
    #[diagnostic(
        code(supervisor::already_exists),
        help("Unit ids are never reused. Pick a new id or omit it to have one generated.")
    )]
    AlreadyExists(String),

    #[error("delete of unit {id} incomplete: {}", .failures.join("; "))]
    #[diagnostic(
        code(supervisor::delete_incomplete),
        help("The unit is no longer listed but some resources may need manual cleanup.")
    )]
    DeleteIncomplete { id: String, failures: Vec<String> },

    #[error("internal error: {0}")]
    #[diagnostic(code(supervisor::internal))]
    Internal(String),
}

impl SupervisorError {
    /// True for errors caused by an unknown unit id
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, SupervisorError::NotFound(_))
    }
}

impl From<std::io::Error> for SupervisorError {
    fn from(err: std::io::Error) -> Self {
        SupervisorError::IoFailure(err.to_string())
    }
}
