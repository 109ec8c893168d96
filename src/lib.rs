//! Peer Sync - a local caching and background-sync agent
//!
//! Keeps PeerConnect backend data warm in a priority-aware cache: preloads
//! what a user needs at login and per page, refreshes it on tiered
//! schedules, and prefetches what a small predictive model expects next.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod preload;
pub mod storage;
pub mod sync;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use error::{Result, SyncError};
pub use tasks::spawn_cleanup_task;
