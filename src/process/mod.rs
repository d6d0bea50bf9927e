/*!
 * Process Module
 * Hosted process execution, output capture, and lifecycle supervision
 */

pub mod capture;
pub mod executor;
pub mod supervisor;
pub mod timers;
pub mod types;
pub mod unit;

// Re-export for convenience
pub use executor::{ProcessExecutor, SpawnedProcess};
pub use supervisor::{LifecycleTiming, Supervisor};
pub use timers::{ScheduledTasks, TaskKind};
pub use types::{ExitInfo, LaunchConfig, UnitState};
pub use unit::{HostedUnit, ProcessHandle, UnitStatus};
