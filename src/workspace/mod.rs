/*!
 * Workspace Module
 * Durable storage for hosted unit sources
 */

mod store;

pub use store::WorkspaceStore;
