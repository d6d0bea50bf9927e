/*!
 * Supervisor Configuration
 * Environment-driven settings with builder-style overrides
 */

use super::errors::{SupervisorError, SupervisorResult};
use super::limits::*;
use crate::process::executor::validate_command;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How unit sources are executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Interpreter or binary invoked with the source path as last argument
    pub command: String,
    /// Extra arguments placed before the source path
    pub args: Vec<String>,
    /// Extension given to persisted source files
    pub source_extension: String,
}

impl RuntimeConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = extension.into();
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME)
    }
}

/// Complete supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub bind_addr: SocketAddr,
    pub workspace_dir: PathBuf,
    pub runtime: RuntimeConfig,
    pub grace_period: Duration,
    pub restart_delay: Duration,
    pub kill_timeout: Duration,
    pub log_capacity: usize,
    pub max_body_bytes: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            workspace_dir: PathBuf::from(DEFAULT_WORKSPACE_DIR),
            runtime: RuntimeConfig::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            restart_delay: DEFAULT_RESTART_DELAY,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl SupervisorConfig {
    /// Load configuration from process environment variables
    ///
    /// Environment variables:
    /// - PORT, SUPERVISOR_HOST: listen address (default 0.0.0.0:3000)
    /// - SUPERVISOR_WORKSPACE: source directory (default ./bots)
    /// - SUPERVISOR_RUNTIME, SUPERVISOR_RUNTIME_ARGS, SUPERVISOR_SOURCE_EXT
    /// - SUPERVISOR_GRACE_MS, SUPERVISOR_RESTART_DELAY_MS, SUPERVISOR_KILL_TIMEOUT_MS
    /// - SUPERVISOR_LOG_CAPACITY, SUPERVISOR_MAX_BODY_BYTES
    pub fn from_env() -> SupervisorResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> SupervisorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let host = parse_var::<IpAddr, _>(&lookup, "SUPERVISOR_HOST")?
            .unwrap_or(config.bind_addr.ip());
        let port = parse_var::<u16, _>(&lookup, "PORT")?.unwrap_or(config.bind_addr.port());
        config.bind_addr = SocketAddr::new(host, port);

        if let Some(dir) = non_empty(&lookup, "SUPERVISOR_WORKSPACE") {
            config.workspace_dir = PathBuf::from(dir);
        }
        if let Some(command) = non_empty(&lookup, "SUPERVISOR_RUNTIME") {
            config.runtime.command = command;
        }
        if let Some(args) = non_empty(&lookup, "SUPERVISOR_RUNTIME_ARGS") {
            config.runtime.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(ext) = non_empty(&lookup, "SUPERVISOR_SOURCE_EXT") {
            config.runtime.source_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "SUPERVISOR_GRACE_MS")? {
            config.grace_period = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "SUPERVISOR_RESTART_DELAY_MS")? {
            config.restart_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "SUPERVISOR_KILL_TIMEOUT_MS")? {
            config.kill_timeout = Duration::from_millis(ms);
        }
        if let Some(cap) = parse_var::<usize, _>(&lookup, "SUPERVISOR_LOG_CAPACITY")? {
            config.log_capacity = cap;
        }
        if let Some(bytes) = parse_var::<usize, _>(&lookup, "SUPERVISOR_MAX_BODY_BYTES")? {
            config.max_body_bytes = bytes;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the supervisor cannot run with
    pub fn validate(&self) -> SupervisorResult<()> {
        validate_command(&self.runtime.command)?;

        if self.log_capacity == 0 {
            return Err(SupervisorError::InvalidRequest(
                "log capacity must be at least 1".into(),
            ));
        }

        let ext = &self.runtime.source_extension;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SupervisorError::InvalidRequest(format!(
                "invalid source extension '{}'",
                ext
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    #[must_use]
    pub fn with_workspace_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    #[must_use]
    pub fn with_restart_delay(mut self, delay: Duration) -> Self {
        self.restart_delay = delay;
        self
    }

    #[must_use]
    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> SupervisorResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            SupervisorError::InvalidRequest(format!("{}='{}': {}", key, raw, e))
        }),
        None => Ok(None),
    }
}
