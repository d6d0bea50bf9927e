/*!
 * Scheduled Tasks
 * Cancellable delayed actions keyed by unit id
 */

use crate::core::UnitId;
use dashmap::DashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::trace;

/// Kind of delayed action attached to a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Starting -> Online after the grace period
    Promotion,
    /// Relaunch after a restart delay
    Relaunch,
}

/// At most one pending task per (unit, kind)
#[derive(Debug, Clone, Default)]
pub struct ScheduledTasks {
    tasks: Arc<DashMap<(UnitId, TaskKind), (u64, AbortHandle)>>,
    next_seq: Arc<AtomicU64>,
}

impl ScheduledTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, replacing any pending task of the same kind
    pub fn schedule<F>(&self, id: &UnitId, kind: TaskKind, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let key = (id.clone(), kind);
        let tasks = Arc::clone(&self.tasks);
        let done_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
            tasks.remove_if(&done_key, |_, (s, _)| *s == seq);
        });

        if let Some((_, previous)) = self.tasks.insert(key.clone(), (seq, handle.abort_handle())) {
            previous.abort();
        }
        // A zero delay can finish before the insert above
        if handle.is_finished() {
            self.tasks.remove_if(&key, |_, (s, _)| *s == seq);
        }
        trace!(unit_id = %id, ?kind, delay_ms = delay.as_millis() as u64, "Task scheduled");
    }

    /// Cancel the pending task of `kind`, returning whether one existed
    pub fn cancel(&self, id: &UnitId, kind: TaskKind) -> bool {
        match self.tasks.remove(&(id.clone(), kind)) {
            Some((_, (_, handle))) => {
                handle.abort();
                trace!(unit_id = %id, ?kind, "Task cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task for `id`
    pub fn cancel_all(&self, id: &UnitId) {
        self.cancel(id, TaskKind::Promotion);
        self.cancel(id, TaskKind::Relaunch);
    }

    pub fn is_pending(&self, id: &UnitId, kind: TaskKind) -> bool {
        self.tasks.contains_key(&(id.clone(), kind))
    }

    /// Number of pending tasks across all units
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
