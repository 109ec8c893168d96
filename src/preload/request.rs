//! Preload request types and scheduling settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::Priority;

// == Preload Priority ==
/// Scheduling tier for a preload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadPriority {
    Immediate,
    High,
    Normal,
    Low,
}

impl PreloadPriority {
    /// Cache priority given to data fetched at this tier.
    pub fn cache_priority(self) -> Priority {
        match self {
            PreloadPriority::Immediate => Priority::Critical,
            PreloadPriority::High => Priority::High,
            PreloadPriority::Normal => Priority::Normal,
            PreloadPriority::Low => Priority::Low,
        }
    }
}

// == Preload Request ==
/// One backend call the preloader should make.
#[derive(Debug, Clone, PartialEq)]
pub struct PreloadRequest {
    /// Cache and preload-map key
    pub key: String,
    /// Endpoint path, e.g. `/api/friends`
    pub endpoint: String,
    pub priority: PreloadPriority,
    /// Freshness window of the fetched data
    pub ttl: Duration,
    /// Cache tags applied to the result
    pub tags: Vec<String>,
}

impl PreloadRequest {
    pub fn new(
        key: impl Into<String>,
        endpoint: impl Into<String>,
        priority: PreloadPriority,
    ) -> Self {
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
            priority,
            ttl: DEFAULT_PRELOAD_TTL,
            tags: Vec::new(),
        }
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Freshness window for preloaded data without an explicit TTL.
pub const DEFAULT_PRELOAD_TTL: Duration = Duration::from_secs(5 * 60);

// == Preload Settings ==
/// Queue scheduling parameters.
#[derive(Debug, Clone)]
pub struct PreloadSettings {
    /// Requests started per batch
    pub max_concurrent: usize,
    /// Pause between two batches
    pub batch_pause: Duration,
    pub immediate_delay: Duration,
    pub high_delay: Duration,
    pub normal_delay: Duration,
    pub low_delay: Duration,
}

impl PreloadSettings {
    /// Start delay for a request of the given tier.
    pub fn delay_for(&self, priority: PreloadPriority) -> Duration {
        match priority {
            PreloadPriority::Immediate => self.immediate_delay,
            PreloadPriority::High => self.high_delay,
            PreloadPriority::Normal => self.normal_delay,
            PreloadPriority::Low => self.low_delay,
        }
    }

    /// Same batching, no waiting. Used where wall-clock pacing does not matter.
    pub fn without_delays(self) -> Self {
        Self {
            batch_pause: Duration::ZERO,
            immediate_delay: Duration::ZERO,
            high_delay: Duration::ZERO,
            normal_delay: Duration::ZERO,
            low_delay: Duration::ZERO,
            ..self
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            max_concurrent: config.max_concurrent_preloads.max(1),
            ..Self::default()
        }
    }
}

impl Default for PreloadSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            batch_pause: Duration::from_millis(200),
            immediate_delay: Duration::ZERO,
            high_delay: Duration::from_millis(100),
            normal_delay: Duration::from_millis(500),
            low_delay: Duration::from_millis(2000),
        }
    }
}
