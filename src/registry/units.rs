/*!
 * Unit Registry
 * Authoritative concurrent map from unit id to supervised unit
 *
 * Structural changes (create, delete) are serialized through the registry's
 * structure lock; readers take it shared so a unit is observed either fully
 * present or fully absent. A create reserves its id under the lock, then
 * saves and launches without holding it, and only publishes the unit once
 * it is running. Per-unit lifecycle fields are guarded by each
 * unit's own lock, so unrelated units never contend.
 */

use super::types::{UnitDetail, UnitSummary};
use crate::core::{SupervisorConfig, SupervisorError, SupervisorResult, UnitId};
use crate::logs::{LogBuffer, LogEntry};
use crate::monitoring::span_lifecycle;
use crate::process::{HostedUnit, LifecycleTiming, ProcessExecutor, Supervisor, UnitState};
use crate::workspace::WorkspaceStore;
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
struct Registered {
    /// Registration order
    seq: u64,
    unit: Arc<HostedUnit>,
}

/// Registry of hosted units
#[derive(Debug)]
pub struct Registry {
    units: DashMap<UnitId, Registered>,
    /// Ids deleted during this run; never handed out again
    retired: DashSet<UnitId>,
    /// Ids reserved by creates still saving or launching
    reserved: DashSet<UnitId>,
    next_seq: AtomicU64,
    structure: RwLock<()>,
    store: WorkspaceStore,
    supervisor: Supervisor,
}

impl Registry {
    /// Build the registry and its collaborators from configuration
    pub fn from_config(config: &SupervisorConfig) -> SupervisorResult<Self> {
        config.validate()?;
        let store =
            WorkspaceStore::open(&config.workspace_dir, &config.runtime.source_extension)?;
        let supervisor = Supervisor::new(
            ProcessExecutor::new(config.runtime.clone()),
            LogBuffer::new(config.log_capacity),
            LifecycleTiming::from(config),
        );
        Ok(Self::new(store, supervisor))
    }

    pub fn new(store: WorkspaceStore, supervisor: Supervisor) -> Self {
        info!(workspace = %store.root().display(), "Unit registry initialized");
        Self {
            units: DashMap::new(),
            retired: DashSet::new(),
            reserved: DashSet::new(),
            next_seq: AtomicU64::new(1),
            structure: RwLock::new(()),
            store,
            supervisor,
        }
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    /// Persist `source`, launch it and register the unit
    ///
    /// `requested_id` is used when given, otherwise an id is generated. Any
    /// failure leaves no source file, log sequence or registry entry behind.
    pub fn create(
        &self,
        name: &str,
        source: &str,
        requested_id: Option<&str>,
    ) -> SupervisorResult<UnitId> {
        let id = match requested_id.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => UnitId::parse(raw)?,
            None => UnitId::generate(),
        };

        let span = span_lifecycle("create", id.as_str());
        let _entered = span.enter();
        let outcome = self.create_inner(&id, name, source);
        span.record_outcome(&outcome);
        outcome.map(|()| id)
    }

    fn create_inner(&self, id: &UnitId, name: &str, source: &str) -> SupervisorResult<()> {
        {
            let _structure = self.structure.write();
            let taken = self.units.contains_key(id) || self.retired.contains(id);
            if taken || !self.reserved.insert(id.clone()) {
                return Err(SupervisorError::AlreadyExists(id.to_string()));
            }
        }

        let outcome = self.launch_reserved(id, name, source);
        if outcome.is_err() {
            self.reserved.remove(id);
        }
        outcome
    }

    /// Save and launch a reserved id, then publish it
    fn launch_reserved(&self, id: &UnitId, name: &str, source: &str) -> SupervisorResult<()> {
        let name = match name.trim() {
            "" => id.as_str(),
            trimmed => trimmed,
        };

        // Source is on disk before the unit can be launched
        let path = self.store.save(id, source.as_bytes())?;
        let unit = Arc::new(HostedUnit::new(id.clone(), name, path));
        let logs = self.supervisor.logs();
        logs.register(id);

        if let Err(e) = self.supervisor.launch(&unit) {
            logs.discard(id);
            if let Err(cleanup) = self.store.remove(id) {
                warn!(unit_id = %id, error = %cleanup, "Cleanup after failed launch incomplete");
            }
            return Err(e);
        }

        let _structure = self.structure.write();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.units.insert(id.clone(), Registered { seq, unit });
        self.reserved.remove(id);
        info!(unit_id = %id, name, "Unit created");
        Ok(())
    }

    /// All live units in registration order
    pub fn list(&self) -> Vec<UnitSummary> {
        let _structure = self.structure.read();

        let mut entries: Vec<Registered> = self.units.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|r| r.seq);

        entries
            .iter()
            .filter_map(|r| self.summarize(&r.unit))
            .collect()
    }

    /// Detailed view of one unit
    pub fn get(&self, id: &str) -> SupervisorResult<UnitDetail> {
        let _structure = self.structure.read();
        let unit = self.lookup(id)?;
        let status = unit.status();
        let summary = self
            .summarize(&unit)
            .ok_or_else(|| SupervisorError::NotFound(id.to_string()))?;

        Ok(UnitDetail {
            summary,
            exit_code: status.exit_code(),
            pid: status.os_pid,
            restart_pending: status.relaunch_pending,
        })
    }

    /// Formatted log snapshot; empty for unknown ids
    pub fn logs(&self, id: &str) -> Vec<String> {
        let _structure = self.structure.read();
        self.lookup(id)
            .map(|unit| self.supervisor.logs().formatted(unit.id()))
            .unwrap_or_default()
    }

    /// Structured log snapshot; empty for unknown ids
    pub fn log_entries(&self, id: &str) -> Vec<LogEntry> {
        let _structure = self.structure.read();
        self.lookup(id)
            .map(|unit| self.supervisor.logs().snapshot(unit.id()))
            .unwrap_or_default()
    }

    /// Stop a unit's process; false when it was not running
    pub fn stop(&self, id: &str) -> SupervisorResult<bool> {
        let span = span_lifecycle("stop", id);
        let _entered = span.enter();
        let outcome = self
            .lookup(id)
            .and_then(|unit| self.supervisor.stop(&unit));
        span.record_outcome(&outcome);
        outcome
    }

    /// Restart a unit; the relaunch happens after the restart delay
    pub fn restart(&self, id: &str) -> SupervisorResult<()> {
        let span = span_lifecycle("restart", id);
        let _entered = span.enter();
        let outcome = self
            .lookup(id)
            .and_then(|unit| self.supervisor.restart(&unit));
        span.record_outcome(&outcome);
        outcome
    }

    /// Delete a unit: kill its process, remove its source, drop its logs
    /// and its registry entry
    ///
    /// Every step runs even if an earlier one failed; failures are reported
    /// together as `DeleteIncomplete`.
    pub fn remove(&self, id: &str) -> SupervisorResult<()> {
        let span = span_lifecycle("delete", id);
        let _entered = span.enter();
        let outcome = self.remove_inner(id);
        span.record_outcome(&outcome);
        outcome
    }

    fn remove_inner(&self, id: &str) -> SupervisorResult<()> {
        let _structure = self.structure.write();
        let unit = self.lookup(id)?;
        let id = unit.id().clone();
        let mut failures = Vec::new();

        if let Err(e) = self.supervisor.retire(&unit) {
            failures.push(format!("stop process: {}", e));
        }
        if let Err(e) = self.store.remove(&id) {
            failures.push(format!("remove source: {}", e));
        }
        self.supervisor.logs().discard(&id);
        self.units.remove(&id);
        self.retired.insert(id.clone());

        if failures.is_empty() {
            info!(unit_id = %id, "Unit deleted");
            Ok(())
        } else {
            warn!(unit_id = %id, ?failures, "Unit deleted with failures");
            Err(SupervisorError::DeleteIncomplete {
                id: id.to_string(),
                failures,
            })
        }
    }

    /// Stop every hosted process; the registry keeps its entries
    pub async fn shutdown(&self) {
        let units: Vec<Arc<HostedUnit>> = self
            .units
            .iter()
            .map(|e| Arc::clone(&e.value().unit))
            .collect();
        self.supervisor.shutdown(&units).await;
        info!(count = units.len(), "Registry shut down");
    }

    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn lookup(&self, id: &str) -> SupervisorResult<Arc<HostedUnit>> {
        self.units
            .get(id)
            .map(|entry| Arc::clone(&entry.value().unit))
            .ok_or_else(|| SupervisorError::NotFound(id.to_string()))
    }

    fn summarize(&self, unit: &HostedUnit) -> Option<UnitSummary> {
        let state = unit.state();
        if state == UnitState::Deleted {
            return None;
        }
        Some(UnitSummary {
            id: unit.id().to_string(),
            name: unit.name().to_string(),
            status: state,
            created_at: unit.created_at(),
            logs: self.supervisor.logs().formatted(unit.id()),
        })
    }
}
