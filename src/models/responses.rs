//! Response DTOs for the agent API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats, Priority};
use crate::preload::PreloadStats;
use crate::sync::{Prediction, SyncReport, SyncTier};

/// Response body for `GET /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
    pub priority: Priority,
    /// Sorted for stable output
    pub tags: Vec<String>,
    pub compressed: bool,
    pub ttl_remaining_ms: u64,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value, entry: &CacheEntry) -> Self {
        let mut tags: Vec<String> = entry.tags.iter().cloned().collect();
        tags.sort();
        Self {
            key: key.into(),
            value,
            priority: entry.priority,
            tags,
            compressed: entry.compressed(),
            ttl_remaining_ms: entry.ttl_remaining_ms(),
        }
    }
}

/// Response body for `PUT /cache`
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub message: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for `PATCH /cache`
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResponse {
    pub key: String,
    /// Other entries removed by `invalidate_tags`
    pub invalidated: usize,
}

/// Response body for `DELETE /cache/:key`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Response body for `POST /cache/invalidate`
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub tags: Vec<String>,
    pub invalidated: usize,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub compressed_entries: usize,
    pub total_entries: usize,
    pub max_entries: usize,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_rate: f64,
    pub preload: PreloadStats,
}

impl StatsResponse {
    pub fn new(stats: &CacheStats, max_entries: usize, preload: PreloadStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            invalidations: stats.invalidations,
            expirations: stats.expirations,
            compressed_entries: stats.compressed_entries,
            total_entries: stats.total_entries,
            max_entries,
            hit_rate: stats.hit_rate(),
            preload,
        }
    }
}

/// Response body for `POST /preload/page`
#[derive(Debug, Clone, Serialize)]
pub struct PagePreloadResponse {
    pub route: String,
    /// Requests newly queued for the route
    pub queued: usize,
}

/// Response body for `POST /sync/:tier`
#[derive(Debug, Clone, Serialize)]
pub struct TierSyncResponse {
    pub tier: SyncTier,
    #[serde(flatten)]
    pub report: SyncReport,
}

/// Response body for `POST /events/user`
#[derive(Debug, Clone, Serialize)]
pub struct UserEventResponse {
    /// Prefetches triggered by the event
    pub prefetched: usize,
}

/// Response body for `POST /events/realtime`
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeEventResponse {
    pub invalidated: usize,
}

/// Response body for `GET /predictions`
#[derive(Debug, Clone, Serialize)]
pub struct PredictionsResponse {
    pub route: Option<String>,
    pub hour: u32,
    pub predictions: Vec<Prediction>,
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC 3339 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec;
    use serde_json::json;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_get_response_serialize() {
        let tags: HashSet<String> = ["profile", "user"].iter().map(|t| t.to_string()).collect();
        let entry = CacheEntry::new(
            codec::encode(json!({"id": 7}), None),
            Duration::from_secs(60),
            Priority::High,
            tags,
            crate::cache::current_timestamp_ms(),
        );
        let resp = GetResponse::new("user:7", json!({"id": 7}), &entry);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["key"], "user:7");
        assert_eq!(json["value"]["id"], 7);
        assert_eq!(json["priority"], "high");
        assert_eq!(json["tags"], json!(["profile", "user"]));
        assert_eq!(json["compressed"], false);
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("my_key");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("my_key"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_stats_response_hit_rate() {
        let mut stats = CacheStats::default();
        for _ in 0..8 {
            stats.record_hit();
        }
        for _ in 0..2 {
            stats.record_miss();
        }
        let resp = StatsResponse::new(&stats, 500, PreloadStats::default());
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.max_entries, 500);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(&CacheStats::default(), 10, PreloadStats::default());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_tier_sync_response_flattens_report() {
        let resp = TierSyncResponse {
            tier: SyncTier::Critical,
            report: SyncReport {
                synced: 3,
                ..SyncReport::default()
            },
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["tier"], "critical");
        assert_eq!(json["synced"], 3);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
