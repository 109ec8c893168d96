//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, tag invalidation and
//! usefulness-based eviction.

mod access;
pub mod codec;
mod entry;
mod options;
mod priority;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use access::{AccessOp, AccessPattern, AccessTracker};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use options::{SetOptions, UpdateOptions};
pub use priority::Priority;
pub use stats::CacheStats;
pub use store::CacheManager;

/// Cache handle shared by the preloader, the sync manager and the HTTP API.
pub type SharedCache = Arc<RwLock<CacheManager>>;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Smallest number of entries removed by one eviction pass
pub const MIN_EVICTION_BATCH: usize = 5;

/// Wraps a cache for sharing across tasks.
pub fn shared(cache: CacheManager) -> SharedCache {
    Arc::new(RwLock::new(cache))
}
