//! Sync tiers and the endpoints each one refreshes.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::Priority;

// == Sync Tier ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTier {
    /// Short interval, data users notice going stale
    Critical,
    /// Longer interval, list views
    Regular,
    /// Only when the user has gone quiet
    Idle,
}

impl SyncTier {
    pub const ALL: [SyncTier; 3] = [SyncTier::Critical, SyncTier::Regular, SyncTier::Idle];

    /// Endpoints refreshed by this tier.
    pub fn targets(self) -> &'static [SyncTarget] {
        match self {
            SyncTier::Critical => CRITICAL_TARGETS,
            SyncTier::Regular => REGULAR_TARGETS,
            SyncTier::Idle => IDLE_TARGETS,
        }
    }

    pub fn cache_priority(self) -> Priority {
        match self {
            SyncTier::Critical => Priority::Critical,
            SyncTier::Regular => Priority::Normal,
            SyncTier::Idle => Priority::Background,
        }
    }

    /// Interval from configuration; the idle tier's is its check period.
    pub fn interval(self, config: &crate::config::Config) -> Duration {
        let secs = match self {
            SyncTier::Critical => config.critical_sync_interval,
            SyncTier::Regular => config.regular_sync_interval,
            SyncTier::Idle => config.idle_sync_interval,
        };
        Duration::from_secs(secs.max(1))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncTier::Critical => "critical",
            SyncTier::Regular => "regular",
            SyncTier::Idle => "idle",
        }
    }
}

impl fmt::Display for SyncTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(SyncTier::Critical),
            "regular" => Ok(SyncTier::Regular),
            "idle" => Ok(SyncTier::Idle),
            other => Err(format!("unknown sync tier '{}'", other)),
        }
    }
}

// == Sync Target ==
/// One endpoint refreshed by a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTarget {
    pub key: &'static str,
    pub endpoint: &'static str,
    pub tags: &'static [&'static str],
    /// Derived entries dropped when this endpoint is refreshed
    pub invalidates: &'static [&'static str],
    pub ttl_secs: u64,
}

const CRITICAL_TARGETS: &[SyncTarget] = &[
    SyncTarget {
        key: "notifications",
        endpoint: "/api/notifications",
        tags: &["notifications"],
        invalidates: &[],
        ttl_secs: 60,
    },
    SyncTarget {
        key: "conversations",
        endpoint: "/api/messages/conversations",
        tags: &["messages"],
        invalidates: &[],
        ttl_secs: 60,
    },
    SyncTarget {
        key: "friend-requests",
        endpoint: "/api/friends/requests",
        tags: &["friends", "friend-requests"],
        invalidates: &[],
        ttl_secs: 120,
    },
];

const REGULAR_TARGETS: &[SyncTarget] = &[
    SyncTarget {
        key: "activities",
        endpoint: "/api/activities",
        tags: &["activities", "activity-list"],
        invalidates: &["activity-list"],
        ttl_secs: 300,
    },
    SyncTarget {
        key: "friends",
        endpoint: "/api/friends",
        tags: &["friends"],
        invalidates: &[],
        ttl_secs: 300,
    },
];

const IDLE_TARGETS: &[SyncTarget] = &[
    SyncTarget {
        key: "suggestions",
        endpoint: "/api/users/suggestions",
        tags: &["discover"],
        invalidates: &[],
        ttl_secs: 900,
    },
    SyncTarget {
        key: "nearby-activities",
        endpoint: "/api/activities/nearby",
        tags: &["activities", "activity-list"],
        invalidates: &[],
        ttl_secs: 600,
    },
    SyncTarget {
        key: "activity-categories",
        endpoint: "/api/activities/categories",
        tags: &["activities"],
        invalidates: &[],
        ttl_secs: 3600,
    },
];
