/*!
 * Hosted Unit
 * The supervised-unit record and its per-unit synchronized runtime state
 */

use super::types::{ExitInfo, UnitState};
use crate::core::{Timestamp, UnitId};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Completion of a signalled process's observer, awaitable from several places
pub(crate) type Reaper = Shared<BoxFuture<'static, ()>>;

/// Exclusive ownership of one live OS process
///
/// The completion observer owns the child itself; this handle is the
/// single slot through which the rest of the supervisor can ask it to
/// terminate. Dropping the handle also requests termination.
#[derive(Debug)]
pub struct ProcessHandle {
    os_pid: u32,
    stop_tx: oneshot::Sender<()>,
    observer: JoinHandle<()>,
    readers: [JoinHandle<()>; 2],
}

impl ProcessHandle {
    pub(crate) fn new(
        os_pid: u32,
        stop_tx: oneshot::Sender<()>,
        observer: JoinHandle<()>,
        readers: [JoinHandle<()>; 2],
    ) -> Self {
        Self {
            os_pid,
            stop_tx,
            observer,
            readers,
        }
    }

    #[inline]
    pub fn os_pid(&self) -> u32 {
        self.os_pid
    }

    /// Request termination; the returned reaper resolves once the process is reaped
    pub(crate) fn signal_stop(self) -> Reaper {
        // Err means the observer already finished
        let _ = self.stop_tx.send(());
        self.observer.map(|_| ()).boxed().shared()
    }

    /// Stop forwarding output before requesting termination
    pub(crate) fn silence_and_stop(self) -> Reaper {
        for reader in &self.readers {
            reader.abort();
        }
        self.signal_stop()
    }
}

/// Mutable lifecycle fields, guarded together by the unit's lock
#[derive(Debug)]
pub(crate) struct UnitRuntime {
    pub state: UnitState,
    pub exit: Option<ExitInfo>,
    /// Incremented on every launch; async observers and timers carry the
    /// generation they were created for and ignore stale ones
    pub generation: u64,
    pub process: Option<ProcessHandle>,
    /// Signalled process of the current generation not yet reaped; no new
    /// process is spawned while this is set
    pub reaping: Option<Reaper>,
    /// Generation a pending restart will relaunch from
    pub relaunch_pending: Option<u64>,
}

/// Point-in-time copy of a unit's lifecycle fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStatus {
    pub state: UnitState,
    pub exit: Option<ExitInfo>,
    pub os_pid: Option<u32>,
    pub generation: u64,
    pub relaunch_pending: bool,
}

impl UnitStatus {
    #[inline]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.and_then(|e| e.code)
    }
}

/// One supervised process: immutable identity plus locked runtime state
#[derive(Debug)]
pub struct HostedUnit {
    id: UnitId,
    name: String,
    source_path: PathBuf,
    created_at: Timestamp,
    runtime: Mutex<UnitRuntime>,
}

impl HostedUnit {
    pub fn new(id: UnitId, name: impl Into<String>, source_path: PathBuf) -> Self {
        Self {
            id,
            name: name.into(),
            source_path,
            created_at: crate::core::now(),
            runtime: Mutex::new(UnitRuntime {
                state: UnitState::Offline,
                exit: None,
                generation: 0,
                process: None,
                reaping: None,
                relaunch_pending: None,
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    #[inline]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn state(&self) -> UnitState {
        self.runtime.lock().state
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.runtime.lock().exit.and_then(|e| e.code)
    }

    /// Consistent snapshot of all lifecycle fields
    pub fn status(&self) -> UnitStatus {
        let rt = self.runtime.lock();
        UnitStatus {
            state: rt.state,
            exit: rt.exit,
            os_pid: rt.process.as_ref().map(ProcessHandle::os_pid),
            generation: rt.generation,
            relaunch_pending: rt.relaunch_pending.is_some(),
        }
    }

    pub(crate) fn runtime(&self) -> MutexGuard<'_, UnitRuntime> {
        self.runtime.lock()
    }
}
