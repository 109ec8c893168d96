//! Local Storage Module
//!
//! A small string key/value store persisted as one JSON document. It holds
//! the agent's durable client state: the last background sync time, the
//! predictive model and the client id. Nothing in it is authoritative, so
//! unreadable files are logged and treated as empty.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

// == Storage Keys ==
pub const LAST_BACKGROUND_SYNC_KEY: &str = "lastBackgroundSync";
pub const PREDICTIVE_MODEL_KEY: &str = "predictiveModel";
pub const CLIENT_ID_KEY: &str = "client-id";

// == Local Storage ==
/// String key/value store backed by an optional JSON file.
#[derive(Debug, Default)]
pub struct LocalStorage {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

impl LocalStorage {
    /// Creates a storage that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens (or lazily creates) a storage file.
    ///
    /// A missing file starts empty; a corrupt one is logged and replaced on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Local storage {} is corrupt, starting empty: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("Could not read local storage {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        debug!("Local storage opened with {} keys", values.len());
        Self {
            path: Some(path),
            values,
        }
    }

    /// Opens the configured file, or an in-memory store when none is set.
    pub fn from_config(config: &crate::config::Config) -> Self {
        match &config.storage_path {
            Some(path) => Self::open(path),
            None => Self::in_memory(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stores a value and flushes. Flush failures are logged, not returned.
    pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
        self.flush_logged();
    }

    pub fn remove_item(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush_logged();
        }
    }

    // == JSON Helpers ==
    /// Reads a JSON value. Missing or malformed data yields `None`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_item(key)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding malformed local storage value '{}': {}", key, e);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(text) => self.set_item(key, text),
            Err(e) => warn!("Could not serialize local storage value '{}': {}", key, e),
        }
    }

    // == Client Id ==
    /// Returns the persistent client id, creating one on first use.
    pub fn client_id(&mut self) -> String {
        if let Some(id) = self.get_item(CLIENT_ID_KEY) {
            return id.to_string();
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.set_item(CLIENT_ID_KEY, id.clone());
        id
    }

    // == Flush ==
    /// Writes the document to disk (no-op in memory).
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    fn flush_logged(&self) {
        if let Err(e) = self.flush() {
            warn!("Failed to persist local storage: {}", e);
        }
    }
}
