/*!
 * Process Types
 * Lifecycle states and launch configuration for hosted units
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a hosted unit
///
/// Transitions:
/// - Starting -> Online (grace period elapsed, process alive)
/// - Starting | Online -> Offline (process exited, or stop requested)
/// - Starting | Online -> Restarting -> Offline (restart signalled, exit observed)
/// - Offline -> Starting (relaunch after restart)
/// - any -> Deleted (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    /// Process spawned, not yet past the grace period
    Starting,
    /// Process survived the grace period
    Online,
    /// No live process
    Offline,
    /// Restart signalled, old process not yet confirmed exited
    Restarting,
    /// Unit removed, terminal
    Deleted,
}

impl UnitState {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            UnitState::Starting => "starting",
            UnitState::Online => "online",
            UnitState::Offline => "offline",
            UnitState::Restarting => "restarting",
            UnitState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a process terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    /// Exit code, absent when killed by a signal
    pub code: Option<i32>,
    /// Terminating signal number on Unix
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn from_status(status: &std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// Exit could not be observed (wait itself failed)
    pub fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "process exited with code {}", code),
            (None, Some(signal)) => write!(f, "process terminated by signal {}", signal),
            (None, None) => f.write_str("process exited with unknown status"),
        }
    }
}

/// Configuration for launching one hosted process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env_vars: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: vec![],
            env_vars: vec![],
            working_dir: None,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_env(mut self, env_vars: Vec<(String, String)>) -> Self {
        self.env_vars = env_vars;
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }
}
