//! Background Tasks Module
//!
//! Long-running tasks started alongside the HTTP server.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Sync Scheduler: Drives the tiered background sync loops

mod cleanup;
mod scheduler;

pub use cleanup::spawn_cleanup_task;
pub use scheduler::{ExecutionMode, SyncScheduler};
