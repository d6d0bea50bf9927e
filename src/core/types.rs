/*!
 * Core Types
 * Common types used across the supervisor
 */

use super::errors::{SupervisorError, SupervisorResult};
use crate::core::limits::MAX_UNIT_ID_LEN;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

/// Wall-clock timestamp used for log entries and creation times
pub type Timestamp = OffsetDateTime;

/// Current UTC time
#[inline]
pub fn now() -> Timestamp {
    OffsetDateTime::now_utc()
}

/// Opaque identifier of a hosted unit
///
/// Ids name a file inside the workspace directory, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(Arc<str>);

impl UnitId {
    /// Validate and wrap a caller-supplied id
    pub fn parse(raw: impl AsRef<str>) -> SupervisorResult<Self> {
        let raw = raw.as_ref().trim();

        if raw.is_empty() {
            return Err(SupervisorError::InvalidRequest("unit id is empty".into()));
        }

        if raw.len() > MAX_UNIT_ID_LEN {
            return Err(SupervisorError::InvalidRequest(format!(
                "unit id longer than {} characters",
                MAX_UNIT_ID_LEN
            )));
        }

        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(SupervisorError::InvalidRequest(format!(
                "unit id '{}' may only contain ASCII letters, digits, '-' and '_'",
                raw
            )));
        }

        Ok(Self(Arc::from(raw)))
    }

    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::new_v4().to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UnitId {
    type Error = SupervisorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UnitId> for String {
    fn from(id: UnitId) -> Self {
        id.0.to_string()
    }
}
