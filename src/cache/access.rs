//! Access Pattern Module
//!
//! Per-key access counters with a short rolling operation log. The data is
//! advisory: it ranks hot keys for speculative refresh and never decides
//! what the cache returns.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

/// Operations kept in each key's rolling log.
pub const MAX_OPERATION_LOG: usize = 100;

// == Access Operation ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessOp {
    Get,
    Set,
    Update,
}

// == Access Pattern ==
/// Access history for a single key.
#[derive(Debug, Clone, Serialize)]
pub struct AccessPattern {
    pub access_count: u64,
    pub first_access: u64,
    pub last_access: u64,
    /// Most recent operations, oldest first
    pub operations: VecDeque<(AccessOp, u64)>,
}

impl AccessPattern {
    fn new(now: u64) -> Self {
        Self {
            access_count: 0,
            first_access: now,
            last_access: now,
            operations: VecDeque::new(),
        }
    }
}

// == Access Tracker ==
/// Tracks access patterns for every key the cache has seen.
#[derive(Debug, Default)]
pub struct AccessTracker {
    patterns: HashMap<String, AccessPattern>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record ==
    /// Logs an operation on `key`.
    pub fn record(&mut self, key: &str, op: AccessOp, now: u64) {
        let pattern = self
            .patterns
            .entry(key.to_string())
            .or_insert_with(|| AccessPattern::new(now));

        pattern.access_count += 1;
        pattern.last_access = now;
        pattern.operations.push_back((op, now));
        while pattern.operations.len() > MAX_OPERATION_LOG {
            pattern.operations.pop_front();
        }
    }

    // == Forget ==
    /// Drops the history for a key.
    pub fn forget(&mut self, key: &str) {
        self.patterns.remove(key);
    }

    pub fn clear(&mut self) {
        self.patterns.clear();
    }

    pub fn get(&self, key: &str) -> Option<&AccessPattern> {
        self.patterns.get(key)
    }

    // == Hot Keys ==
    /// Keys ordered by access count, most accessed first. Ties go to the
    /// most recently accessed key.
    pub fn hot_keys(&self, limit: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, &AccessPattern)> = self.patterns.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.access_count
                .cmp(&a.1.access_count)
                .then(b.1.last_access.cmp(&a.1.last_access))
        });
        ranked
            .into_iter()
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
