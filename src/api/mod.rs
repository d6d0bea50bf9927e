/*!
 * API Module
 * HTTP request/response surface over the registry
 */

pub mod handlers;
pub mod server;
pub mod types;

use crate::registry::Registry;
use std::sync::Arc;

// Re-export for convenience
pub use server::{router, serve};
pub use types::*;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}
