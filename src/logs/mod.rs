/*!
 * Logs Module
 * Captured output and lifecycle events of hosted units
 */

mod buffer;
mod types;

pub use buffer::LogBuffer;
pub use types::{LogEntry, LogLevel};
