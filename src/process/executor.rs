/*!
 * Process Executor
 * Handles OS-level process spawning and termination
 */

use super::types::{ExitInfo, LaunchConfig};
use crate::core::{RuntimeConfig, SupervisorError, SupervisorResult, UnitId};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{info, warn};

/// A freshly spawned OS process with its captured output streams
#[derive(Debug)]
pub struct SpawnedProcess {
    pub os_pid: u32,
    pub child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Builds and spawns hosted processes for the configured runtime
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    runtime: RuntimeConfig,
}

impl ProcessExecutor {
    pub fn new(runtime: RuntimeConfig) -> Self {
        info!(runtime = %runtime.command, "Process executor initialized");
        Self { runtime }
    }

    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    /// Launch configuration running `source` under the configured runtime
    pub fn launch_config(&self, id: &UnitId, name: &str, source: &Path) -> LaunchConfig {
        let mut args = self.runtime.args.clone();
        args.push(source.to_string_lossy().into_owned());

        let mut config = LaunchConfig::new(self.runtime.command.clone())
            .with_args(args)
            .with_env(vec![
                ("UNIT_ID".to_string(), id.to_string()),
                ("UNIT_NAME".to_string(), name.to_string()),
            ]);
        if let Some(dir) = source.parent() {
            config = config.with_working_dir(dir.to_path_buf());
        }
        config
    }

    /// Spawn a unit's source with stdout and stderr captured
    pub fn spawn(&self, id: &UnitId, name: &str, source: &Path) -> SupervisorResult<SpawnedProcess> {
        let config = self.launch_config(id, name, source);
        self.spawn_with(&config)
    }

    /// Spawn an arbitrary launch configuration
    pub fn spawn_with(&self, config: &LaunchConfig) -> SupervisorResult<SpawnedProcess> {
        validate_command(&config.command)?;

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        // Children inherit the supervisor environment plus their own identity
        for (key, value) in &config.env_vars {
            cmd.env(key, value);
        }

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| SupervisorError::SpawnFailure(format!("{}: {}", config.command, e)))?;

        let os_pid = child
            .id()
            .ok_or_else(|| SupervisorError::SpawnFailure("process exited before pid was read".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SupervisorError::Internal("stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SupervisorError::Internal("stderr was not captured".into()))?;

        Ok(SpawnedProcess {
            os_pid,
            child,
            stdout,
            stderr,
        })
    }
}

/// Ask a process to exit, escalating to a hard kill after `timeout`
pub async fn terminate(child: &mut Child, timeout: Duration) -> ExitInfo {
    if let Some(pid) = child.id() {
        send_sigterm(pid);

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => return ExitInfo::from_status(&status),
            Ok(Err(e)) => {
                warn!(os_pid = pid, error = %e, "Wait after SIGTERM failed");
            }
            Err(_) => {
                warn!(os_pid = pid, timeout_ms = timeout.as_millis() as u64, "Process ignored SIGTERM, killing");
            }
        }
    }

    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Kill failed");
    }
    match child.wait().await {
        Ok(status) => ExitInfo::from_status(&status),
        Err(e) => {
            warn!(error = %e, "Wait after kill failed");
            ExitInfo::unknown()
        }
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        warn!(os_pid = pid, error = %e, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}

/// Validate a runtime command for shell and path injection
pub fn validate_command(command: &str) -> SupervisorResult<()> {
    if command.trim().is_empty() {
        return Err(SupervisorError::InvalidRequest("empty runtime command".into()));
    }

    let dangerous_chars = [';', '|', '&', '\n', '\r', '\0', '`', '$', '(', ')'];
    if dangerous_chars.iter().any(|&c| command.contains(c)) {
        return Err(SupervisorError::InvalidRequest(
            "runtime command contains dangerous characters".into(),
        ));
    }

    if command.contains("..") {
        return Err(SupervisorError::InvalidRequest(
            "runtime command contains path traversal".into(),
        ));
    }

    Ok(())
}
