/*!
 * Supervisor Limits and Constants
 *
 * Centralized location for defaults, thresholds, and magic numbers.
 * Every value here can be overridden through `SupervisorConfig`.
 */

use std::time::Duration;

// =============================================================================
// LIFECYCLE TIMING
// =============================================================================

/// Delay after launch before a still-running process is reported online
/// Heuristic liveness guess, not a health check
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Delay between stopping a process and relaunching it on restart
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Time a process gets to exit after SIGTERM before it is killed
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// LOG BUFFER
// =============================================================================

/// Entries kept per unit before the oldest are evicted
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Longest stored log line in bytes, longer lines are truncated
pub const MAX_LOG_LINE_BYTES: usize = 8 * 1024;

// =============================================================================
// API / WORKSPACE
// =============================================================================

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Largest accepted request body (50MB, matches source uploads)
pub const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Longest accepted unit id
pub const MAX_UNIT_ID_LEN: usize = 64;

/// Default workspace directory for unit sources
pub const DEFAULT_WORKSPACE_DIR: &str = "bots";

/// Default runtime used to execute unit sources
pub const DEFAULT_RUNTIME: &str = "node";

/// Default source file extension
pub const DEFAULT_SOURCE_EXTENSION: &str = "js";
