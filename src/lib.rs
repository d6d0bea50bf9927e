/*!
 * Unit Supervisor Library
 * Hosts arbitrary program sources as supervised child processes
 *
 * Layout, leaves first:
 * - `workspace`: on-disk source files, one per unit
 * - `logs`: bounded per-unit log sequences
 * - `process`: spawning, output capture and the lifecycle state machine
 * - `registry`: the authoritative map of hosted units
 * - `api`: HTTP surface over the registry
 */

pub mod api;
pub mod core;
pub mod logs;
pub mod monitoring;
pub mod process;
pub mod registry;
pub mod workspace;

// Re-exports
pub use crate::core::{
    RuntimeConfig, SupervisorConfig, SupervisorError, SupervisorResult, UnitId,
};
pub use logs::{LogBuffer, LogEntry, LogLevel};
pub use monitoring::init_tracing;
pub use process::{HostedUnit, Supervisor, UnitState, UnitStatus};
pub use registry::{Registry, UnitDetail, UnitSummary};
pub use workspace::WorkspaceStore;
