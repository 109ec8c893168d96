//! Request DTOs for the agent API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{Priority, SetOptions, UpdateOptions, MAX_KEY_LENGTH};
use crate::sync::RealtimeEvent;

/// Checks a cache key, returning the reason it is rejected.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for `PUT /cache`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in milliseconds (uses default if not specified)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// `false` keeps large values unencoded
    #[serde(default)]
    pub compress: Option<bool>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = validate_key(&self.key) {
            return Some(error);
        }
        if self.ttl_ms == Some(0) {
            return Some("ttl_ms must be greater than zero".to_string());
        }
        None
    }

    /// Cache options carried by the request.
    pub fn options(&self) -> SetOptions {
        SetOptions {
            ttl: self.ttl_ms.map(Duration::from_millis),
            priority: self.priority,
            tags: self
                .tags
                .as_ref()
                .map(|tags| tags.iter().cloned().collect()),
            compress: self.compress,
        }
    }
}

/// Request body for `PATCH /cache`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    #[serde(flatten)]
    pub set: SetRequest,
    /// Tags whose other entries become stale after this write
    #[serde(default)]
    pub invalidate_tags: Vec<String>,
}

impl UpdateRequest {
    pub fn validate(&self) -> Option<String> {
        self.set.validate()
    }

    pub fn options(&self) -> UpdateOptions {
        UpdateOptions::new()
            .with_set(self.set.options())
            .invalidate(self.invalidate_tags.iter().cloned())
    }
}

/// Request body for `POST /cache/invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub tags: Vec<String>,
}

impl InvalidateRequest {
    pub fn validate(&self) -> Option<String> {
        if self.tags.is_empty() {
            return Some("At least one tag is required".to_string());
        }
        None
    }
}

/// Request body for `POST /preload/page`
#[derive(Debug, Clone, Deserialize)]
pub struct PagePreloadRequest {
    pub route: String,
}

/// Request body for `POST /events/realtime`
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeEventRequest {
    pub event: RealtimeEvent,
}

/// Query string for `GET /predictions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionQuery {
    #[serde(default)]
    pub route: Option<String>,
    /// Local hour 0-23; the current hour when omitted
    #[serde(default)]
    pub hour: Option<u32>,
}

impl PredictionQuery {
    pub fn validate(&self) -> Option<String> {
        match self.hour {
            Some(hour) if hour > 23 => Some(format!("hour must be 0-23, got {}", hour)),
            _ => None,
        }
    }
}
