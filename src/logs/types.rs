/*!
 * Log Types
 * Entries captured from hosted units and lifecycle events
 */

use crate::core::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Origin of a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Line read from the process's standard output
    Info,
    /// Line read from the process's standard error
    Error,
    /// Lifecycle event recorded by the supervisor
    System,
}

impl LogLevel {
    #[inline]
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::System => "SYSTEM",
        }
    }
}

/// One timestamped line in a unit's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: Timestamp,
    pub level: LogLevel,
    pub text: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            timestamp: crate::core::now(),
            level,
            text: text.into(),
        }
    }

    /// Flat form used by the HTTP surface, e.g. `[INFO] ready`
    pub fn formatted(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.tag(), self.text)
    }
}
