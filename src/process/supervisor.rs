/*!
 * Process Supervisor
 * Lifecycle state machine for hosted units
 *
 * # Concurrency
 *
 * Every unit carries its own lock around its lifecycle fields. Request
 * handlers and the asynchronous actors below all go through that lock:
 *
 * - two output readers per process (stdout, stderr) feeding the Log Buffer
 * - one completion observer per process, owning the child and reaping it
 * - a promotion timer (Starting -> Online after the grace period)
 * - a relaunch timer while a restart is pending
 *
 * Observers and timers remember the launch generation they belong to and
 * do nothing once the unit has moved on, which makes exit handling
 * idempotent with respect to stop, restart and delete.
 *
 * A signalled process stays in the unit's `reaping` slot until its observer
 * has reaped it. Nothing is spawned for the unit while that slot is set.
 */

use super::capture::spawn_reader;
use super::executor::{terminate, ProcessExecutor};
use super::timers::{ScheduledTasks, TaskKind};
use super::types::{ExitInfo, UnitState};
use super::unit::{HostedUnit, ProcessHandle, UnitRuntime};
use crate::core::{SupervisorConfig, SupervisorError, SupervisorResult};
use crate::logs::{LogBuffer, LogLevel};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Fixed delays driving the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTiming {
    /// Best-effort liveness heuristic, not a health check
    pub grace_period: Duration,
    pub restart_delay: Duration,
    pub kill_timeout: Duration,
}

impl From<&SupervisorConfig> for LifecycleTiming {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            grace_period: config.grace_period,
            restart_delay: config.restart_delay,
            kill_timeout: config.kill_timeout,
        }
    }
}

/// Launches, stops and reconciles hosted processes
#[derive(Debug, Clone)]
pub struct Supervisor {
    executor: ProcessExecutor,
    logs: LogBuffer,
    timers: ScheduledTasks,
    timing: LifecycleTiming,
}

impl Supervisor {
    pub fn new(executor: ProcessExecutor, logs: LogBuffer, timing: LifecycleTiming) -> Self {
        info!(
            grace_ms = timing.grace_period.as_millis() as u64,
            restart_delay_ms = timing.restart_delay.as_millis() as u64,
            "Process supervisor initialized"
        );
        Self {
            executor,
            logs,
            timers: ScheduledTasks::new(),
            timing,
        }
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    pub fn timers(&self) -> &ScheduledTasks {
        &self.timers
    }

    pub fn timing(&self) -> LifecycleTiming {
        self.timing
    }

    /// Spawn the unit's process and move it to `Starting`
    ///
    /// Fails synchronously with `SpawnFailure` when the OS cannot start it.
    pub fn launch(&self, unit: &Arc<HostedUnit>) -> SupervisorResult<u32> {
        let (os_pid, generation) = {
            let mut rt = unit.runtime();
            if rt.state == UnitState::Deleted {
                return Err(SupervisorError::NotFound(unit.id().to_string()));
            }
            self.spawn_locked(unit, &mut rt)?
        };

        self.schedule_promotion(unit, generation);
        Ok(os_pid)
    }

    /// Terminate the unit's process and mark it `Offline` immediately
    ///
    /// Returns false when there was nothing to stop. A pending relaunch is
    /// cancelled as well.
    pub fn stop(&self, unit: &Arc<HostedUnit>) -> SupervisorResult<bool> {
        let id = unit.id();
        let mut rt = unit.runtime();
        if rt.state == UnitState::Deleted {
            return Err(SupervisorError::NotFound(id.to_string()));
        }

        self.timers.cancel(id, TaskKind::Promotion);
        let relaunch_cancelled = self.timers.cancel(id, TaskKind::Relaunch);
        let relaunch_cleared = rt.relaunch_pending.take().is_some();
        let handle = rt.process.take();

        if handle.is_none() && !relaunch_cancelled && !relaunch_cleared {
            debug!(unit_id = %id, state = %rt.state, "Stop on idle unit ignored");
            return Ok(false);
        }

        let os_pid = handle.map(|h| {
            let pid = h.os_pid();
            // Observer keeps running and reaps the process
            rt.reaping = Some(h.signal_stop());
            pid
        });

        let previous = rt.state;
        rt.state = UnitState::Offline;
        self.logs.append(id, LogLevel::System, "stopped by request");
        info!(unit_id = %id, from = %previous, os_pid = ?os_pid, "Unit stopped");
        Ok(true)
    }

    /// Stop the unit and relaunch it after the restart delay
    ///
    /// The relaunch waits for the old process to be reaped, including one
    /// still draining from an earlier stop, so two live processes never
    /// exist for one unit. Logs are kept across restarts.
    pub fn restart(&self, unit: &Arc<HostedUnit>) -> SupervisorResult<()> {
        let id = unit.id();
        let (old_observer, generation) = {
            let mut rt = unit.runtime();
            if rt.state == UnitState::Deleted {
                return Err(SupervisorError::NotFound(id.to_string()));
            }
            if rt.relaunch_pending.is_some() {
                debug!(unit_id = %id, "Restart already pending");
                return Ok(());
            }

            self.timers.cancel(id, TaskKind::Promotion);
            let old_observer = match rt.process.take() {
                Some(handle) => {
                    let reaper = handle.signal_stop();
                    rt.reaping = Some(reaper.clone());
                    rt.state = UnitState::Restarting;
                    Some(reaper)
                }
                None => rt.reaping.clone(),
            };
            rt.relaunch_pending = Some(rt.generation);
            self.logs.append(id, LogLevel::System, "restart requested");
            (old_observer, rt.generation)
        };

        info!(
            unit_id = %id,
            delay_ms = self.timing.restart_delay.as_millis() as u64,
            "Unit restart scheduled"
        );

        let supervisor = self.clone();
        let unit_ref = Arc::clone(unit);
        self.timers.schedule(id, TaskKind::Relaunch, self.timing.restart_delay, async move {
            if let Some(reaper) = old_observer {
                // Bounded by the kill timeout inside the observer
                debug!(unit_id = %unit_ref.id(), "Waiting for previous process to be reaped");
                reaper.await;
            }
            supervisor.relaunch(&unit_ref, generation);
        });

        Ok(())
    }

    /// Mark the unit `Deleted` and tear down its process and timers
    ///
    /// Output readers are silenced first so no further log writes happen
    /// for the unit; the observer still reaps the process.
    pub fn retire(&self, unit: &Arc<HostedUnit>) -> SupervisorResult<()> {
        let id = unit.id();
        let mut rt = unit.runtime();
        if rt.state == UnitState::Deleted {
            return Err(SupervisorError::NotFound(id.to_string()));
        }

        let previous = rt.state;
        rt.state = UnitState::Deleted;
        rt.relaunch_pending = None;
        self.timers.cancel_all(id);

        let os_pid = rt.process.take().map(|h| {
            let pid = h.os_pid();
            rt.reaping = Some(h.silence_and_stop());
            pid
        });

        info!(unit_id = %id, from = %previous, os_pid = ?os_pid, "Unit retired");
        Ok(())
    }

    /// Terminate every given unit's process and wait for them to be reaped
    pub async fn shutdown(&self, units: &[Arc<HostedUnit>]) {
        let mut observers = Vec::new();

        for unit in units {
            let mut rt = unit.runtime();
            self.timers.cancel_all(unit.id());
            rt.relaunch_pending = None;
            if let Some(handle) = rt.process.take() {
                rt.reaping = Some(handle.signal_stop());
            }
            if let Some(reaper) = rt.reaping.clone() {
                observers.push(reaper);
            }
        }

        if observers.is_empty() {
            return;
        }

        let count = observers.len();
        info!(count, "Stopping hosted processes");
        let deadline = self.timing.kill_timeout + Duration::from_secs(1);
        if tokio::time::timeout(deadline, join_all(observers)).await.is_err() {
            warn!(count, "Timed out waiting for hosted processes to exit");
        }
    }

    /// Spawn under an already-held unit lock
    fn spawn_locked(
        &self,
        unit: &Arc<HostedUnit>,
        rt: &mut UnitRuntime,
    ) -> SupervisorResult<(u32, u64)> {
        let id = unit.id();
        if rt.process.is_some() || rt.reaping.is_some() {
            return Err(SupervisorError::Internal(format!(
                "unit {} already has a live process",
                id
            )));
        }

        let spawned = self.executor.spawn(id, unit.name(), unit.source_path())?;
        let os_pid = spawned.os_pid;

        rt.generation += 1;
        rt.exit = None;
        rt.state = UnitState::Starting;
        let generation = rt.generation;

        self.logs
            .append(id, LogLevel::System, format!("process started (pid {})", os_pid));

        let readers = [
            spawn_reader(spawned.stdout, id.clone(), LogLevel::Info, self.logs.clone()),
            spawn_reader(spawned.stderr, id.clone(), LogLevel::Error, self.logs.clone()),
        ];

        let (stop_tx, stop_rx) = oneshot::channel();
        let observer = tokio::spawn(observe(
            self.clone(),
            Arc::clone(unit),
            generation,
            spawned.child,
            stop_rx,
        ));

        rt.process = Some(ProcessHandle::new(os_pid, stop_tx, observer, readers));
        info!(unit_id = %id, os_pid, generation, "Process launched");
        Ok((os_pid, generation))
    }

    /// Relaunch after a restart delay, unless stopped or deleted meanwhile
    fn relaunch(&self, unit: &Arc<HostedUnit>, from_generation: u64) {
        let id = unit.id();
        let generation = {
            let mut rt = unit.runtime();
            if rt.state == UnitState::Deleted || rt.relaunch_pending != Some(from_generation) {
                debug!(unit_id = %id, "Relaunch cancelled");
                return;
            }
            rt.relaunch_pending = None;

            match self.spawn_locked(unit, &mut rt) {
                Ok((_, generation)) => generation,
                Err(e) => {
                    rt.state = UnitState::Offline;
                    self.logs
                        .append(id, LogLevel::System, format!("restart failed: {}", e));
                    error!(unit_id = %id, error = %e, "Relaunch failed");
                    return;
                }
            }
        };

        self.schedule_promotion(unit, generation);
    }

    fn schedule_promotion(&self, unit: &Arc<HostedUnit>, generation: u64) {
        let unit_ref = Arc::clone(unit);
        self.timers.schedule(unit.id(), TaskKind::Promotion, self.timing.grace_period, async move {
            let mut rt = unit_ref.runtime();
            if rt.generation == generation && rt.state == UnitState::Starting && rt.process.is_some() {
                rt.state = UnitState::Online;
                info!(unit_id = %unit_ref.id(), generation, "Unit online");
            }
        });
    }

    /// Completion handling: the only path from a live process to `Offline`
    /// that is driven by the process itself
    fn on_exit(&self, unit: &HostedUnit, generation: u64, exit: ExitInfo) {
        let id = unit.id();
        let mut rt = unit.runtime();
        // Only the current generation can be reaping; spawns wait for it
        rt.reaping = None;

        if rt.state == UnitState::Deleted || rt.generation != generation {
            debug!(unit_id = %id, generation, "Exit of retired process ignored");
            return;
        }

        // A handle still in the slot belongs to this generation (stop not requested)
        rt.process = None;
        rt.exit = Some(exit);
        let previous = rt.state;
        if previous != UnitState::Offline {
            rt.state = UnitState::Offline;
        }
        self.timers.cancel(id, TaskKind::Promotion);
        self.logs.append(id, LogLevel::System, exit.to_string());

        info!(
            unit_id = %id,
            from = %previous,
            exit_code = ?exit.code,
            signal = ?exit.signal,
            "Process exited"
        );
    }
}

/// Completion observer: owns the child until it is reaped
async fn observe(
    supervisor: Supervisor,
    unit: Arc<HostedUnit>,
    generation: u64,
    mut child: Child,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // A dropped handle counts as a stop request
    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut stop_rx => None,
    };

    let exit = match waited {
        Some(Ok(status)) => ExitInfo::from_status(&status),
        Some(Err(e)) => {
            warn!(unit_id = %unit.id(), error = %e, "Wait on process failed");
            ExitInfo::unknown()
        }
        None => terminate(&mut child, supervisor.timing.kill_timeout).await,
    };

    supervisor.on_exit(&unit, generation, exit);
}
