//! Cache Manager Module
//!
//! Main cache engine combining HashMap storage with TTL expiration, tag
//! invalidation and usefulness-based batch eviction.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::cache::codec;
use crate::cache::entry::current_timestamp_ms;
use crate::cache::{
    AccessOp, AccessTracker, CacheEntry, CacheStats, SetOptions, UpdateOptions,
    MIN_EVICTION_BATCH,
};

// == Cache Manager ==
/// In-memory key/value cache.
///
/// Every operation is synchronous and infallible: failures inside the cache
/// are logged and degrade to a miss or a raw write.
#[derive(Debug)]
pub struct CacheManager {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Per-key access history
    access: AccessTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_size: usize,
    /// TTL for entries written without one
    default_ttl: Duration,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a new cache with the given capacity and default TTL.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            access: AccessTracker::new(),
            stats: CacheStats::new(),
            max_size: max_size.max(1),
            default_ttl,
        }
    }

    /// Creates a cache from the agent configuration.
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(config.max_entries, config.default_ttl())
    }

    // == Set ==
    /// Stores a value. Overwrites silently.
    ///
    /// When the key is new and the cache is full, an eviction batch runs
    /// before the insert.
    pub fn set(&mut self, key: impl Into<String>, value: Value, options: SetOptions) {
        self.set_at(key.into(), value, options, current_timestamp_ms(), AccessOp::Set);
    }

    pub(crate) fn set_at(
        &mut self,
        key: String,
        value: Value,
        options: SetOptions,
        now: u64,
        op: AccessOp,
    ) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_batch(now);
        }

        let stored = codec::encode(value, options.compress);
        let entry = CacheEntry::new(
            stored,
            options.ttl.unwrap_or(self.default_ttl),
            options.priority.unwrap_or_default(),
            options.tags.unwrap_or_default(),
            now,
        );

        trace!(
            "Cache set: {} (priority={}, compressed={})",
            key,
            entry.priority,
            entry.compressed()
        );
        self.entries.insert(key.clone(), entry);
        self.access.record(&key, op, now);
    }

    // == Get ==
    /// Returns the decoded value, or `None` if absent or expired.
    ///
    /// Expired entries are removed on access.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_at(key, current_timestamp_ms())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: u64) -> Option<Value> {
        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired_at(now) {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            trace!("Cache miss (expired): {}", key);
            return None;
        }

        match codec::decode(&entry.value) {
            Ok(value) => {
                entry.touch(now);
                self.access.record(key, AccessOp::Get, now);
                self.stats.record_hit();
                Some(value)
            }
            Err(e) => {
                warn!("Dropping undecodable cache entry {}: {}", key, e);
                self.remove_entry(key);
                self.stats.record_miss();
                None
            }
        }
    }

    // == Update ==
    /// Rewrites an entry, inheriting its tags and priority when the options
    /// leave them unset, then invalidates every other entry tagged with any
    /// of `invalidate_tags`.
    ///
    /// Returns the number of entries invalidated.
    pub fn update(&mut self, key: impl Into<String>, value: Value, options: UpdateOptions) -> usize {
        self.update_at(key.into(), value, options, current_timestamp_ms())
    }

    pub(crate) fn update_at(
        &mut self,
        key: String,
        value: Value,
        options: UpdateOptions,
        now: u64,
    ) -> usize {
        let UpdateOptions {
            mut set,
            invalidate_tags,
        } = options;

        if let Some(prior) = self.entries.get(&key) {
            if set.tags.is_none() {
                set.tags = Some(prior.tags.clone());
            }
            if set.priority.is_none() {
                set.priority = Some(prior.priority);
            }
        }

        self.set_at(key.clone(), value, set, now, AccessOp::Update);

        if invalidate_tags.is_empty() {
            return 0;
        }
        self.invalidate_matching(&invalidate_tags, Some(&key))
    }

    // == Invalidate By Tags ==
    /// Removes every entry whose tags intersect `tags`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_by_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> usize {
        self.invalidate_matching(tags, None)
    }

    fn invalidate_matching<S: AsRef<str>>(&mut self, tags: &[S], keep: Option<&str>) -> usize {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| Some(key.as_str()) != keep && entry.has_any_tag(tags))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove_entry(key);
        }

        if !doomed.is_empty() {
            self.stats.record_invalidations(doomed.len());
            debug!(
                "Invalidated {} entries for tags [{}]",
                doomed.len(),
                tags.iter().map(|t| t.as_ref()).collect::<Vec<&str>>().join(", ")
            );
        }
        doomed.len()
    }

    // == Eviction ==
    /// Number of entries removed by one eviction pass.
    pub fn eviction_batch_size(&self) -> usize {
        MIN_EVICTION_BATCH.max(self.max_size / 10)
    }

    /// Removes the least useful entries, lowest score first.
    fn evict_batch(&mut self, now: u64) -> usize {
        let batch = self.eviction_batch_size().min(self.entries.len());

        let mut scored: Vec<(f64, &String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.usefulness(now), key))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        let victims: Vec<String> = scored
            .into_iter()
            .take(batch)
            .map(|(_, key)| key.clone())
            .collect();

        for key in &victims {
            self.remove_entry(key);
        }

        self.stats.record_evictions(victims.len());
        debug!(
            "Evicted {} entries (capacity {})",
            victims.len(),
            self.max_size
        );
        victims.len()
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        if !self.entries.contains_key(key) {
            return false;
        }
        self.remove_entry(key);
        true
    }

    /// Removes every entry and all access history.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.access.clear();
    }

    fn remove_entry(&mut self, key: &str) {
        self.entries.remove(key);
        self.access.forget(key);
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        self.cleanup_expired_at(current_timestamp_ms())
    }

    pub(crate) fn cleanup_expired_at(&mut self, now: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Inspection ==
    /// True when a live (unexpired) entry exists. Does not count as an access.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Metadata for a key, without touching it.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Keys carrying `tag`.
    pub fn keys_with_tag(&self, tag: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.tags.contains(tag))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Most accessed live keys, for speculative refresh.
    pub fn hot_keys(&self, limit: usize) -> Vec<String> {
        self.access
            .hot_keys(self.access.len())
            .into_iter()
            .filter(|key| self.entries.contains_key(key))
            .take(limit)
            .collect()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.compressed_entries = self.entries.values().filter(|e| e.compressed()).count();
        stats
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn raw_value(&self, key: &str) -> Option<&codec::StoredValue> {
        self.entries.get(key).map(|e| &e.value)
    }
}
