//! Write options for cache operations.

use std::collections::HashSet;
use std::time::Duration;

use crate::cache::Priority;

// == Set Options ==
/// Options accepted by [`CacheManager::set`](crate::cache::CacheManager::set).
///
/// Unset fields fall back to the cache defaults: configured TTL, `Normal`
/// priority, no tags, size-based encoding.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub priority: Option<Priority>,
    pub tags: Option<HashSet<String>>,
    pub compress: Option<bool>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }
}

// == Update Options ==
/// Options accepted by [`CacheManager::update`](crate::cache::CacheManager::update).
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub set: SetOptions,
    /// Other entries carrying any of these tags are invalidated
    pub invalidate_tags: Vec<String>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_set(mut self, set: SetOptions) -> Self {
        self.set = set;
        self
    }

    pub fn invalidate<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invalidate_tags = tags.into_iter().map(Into::into).collect();
        self
    }
}
