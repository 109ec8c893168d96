//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL, priority and
//! tag metadata.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::codec::StoredValue;
use crate::cache::Priority;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: StoredValue,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), never before `created_at`
    pub expires_at: u64,
    /// Last read or write (Unix milliseconds)
    pub last_accessed: u64,
    /// Number of reads and writes
    pub access_count: u64,
    /// Eviction priority
    pub priority: Priority,
    /// Invalidation labels
    pub tags: HashSet<String>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stamped at `now`.
    pub fn new(
        value: StoredValue,
        ttl: Duration,
        priority: Priority,
        tags: HashSet<String>,
        now: u64,
    ) -> Self {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        Self {
            value,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
            last_accessed: now,
            access_count: 1,
            priority,
            tags,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= expires_at`, so a zero TTL is expired
    /// immediately.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// True when the payload is stored base64-encoded.
    pub fn compressed(&self) -> bool {
        self.value.is_encoded()
    }

    /// True when any of `tags` labels this entry.
    pub fn has_any_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|t| self.tags.contains(t.as_ref()))
    }

    // == Touch ==
    /// Records an access at `now`.
    pub fn touch(&mut self, now: u64) {
        self.last_accessed = now;
        self.access_count = self.access_count.saturating_add(1);
    }

    // == Usefulness ==
    /// Eviction score: higher means more worth keeping.
    ///
    /// `priority − 0.1 × seconds since last access − 0.1 × (1000 / access count)`.
    /// Expired entries score negative infinity.
    pub fn usefulness(&self, now: u64) -> f64 {
        if self.is_expired_at(now) {
            return f64::NEG_INFINITY;
        }
        let idle_secs = now.saturating_sub(self.last_accessed) as f64 / 1000.0;
        let frequency_penalty = 1000.0 / self.access_count.max(1) as f64;
        self.priority.score() - 0.1 * idle_secs - 0.1 * frequency_penalty
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> u64 {
        self.expires_at.saturating_sub(current_timestamp_ms())
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
