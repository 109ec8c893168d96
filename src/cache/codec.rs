//! Value Codec Module
//!
//! Large payloads are kept as base64 text of their JSON serialization.
//! This is an encoding, not real compression: it keeps big values out of
//! the structured `Value` tree and is reversed on every read.

use base64::{engine::general_purpose, Engine as _};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SyncError};

/// Serialized size (bytes) above which values are encoded.
pub const COMPRESSION_THRESHOLD: usize = 1024;

// == Stored Value ==
/// Representation of a value inside a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// Value kept as-is
    Raw(Value),
    /// Base64 text of the value's JSON serialization
    Encoded(String),
}

impl StoredValue {
    pub fn is_encoded(&self) -> bool {
        matches!(self, StoredValue::Encoded(_))
    }
}

// == Encode ==
/// Prepares a value for storage.
///
/// `compress` of `Some(false)` disables encoding; otherwise values whose
/// serialization exceeds [`COMPRESSION_THRESHOLD`] are encoded. Serialization
/// failures fall back to storing the raw value.
pub fn encode(value: Value, compress: Option<bool>) -> StoredValue {
    if compress == Some(false) {
        return StoredValue::Raw(value);
    }

    match serde_json::to_string(&value) {
        Ok(serialized) if serialized.len() > COMPRESSION_THRESHOLD => {
            StoredValue::Encoded(general_purpose::STANDARD.encode(serialized))
        }
        Ok(_) => StoredValue::Raw(value),
        Err(e) => {
            warn!("Failed to serialize cache value, storing raw: {}", e);
            StoredValue::Raw(value)
        }
    }
}

// == Decode ==
/// Restores a stored value.
pub fn decode(stored: &StoredValue) -> Result<Value> {
    match stored {
        StoredValue::Raw(value) => Ok(value.clone()),
        StoredValue::Encoded(text) => {
            let bytes = general_purpose::STANDARD
                .decode(text)
                .map_err(|e| SyncError::Decode(e.to_string()))?;
            Ok(serde_json::from_slice(&bytes)?)
        }
    }
}
