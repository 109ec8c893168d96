//! Configuration Module
//!
//! Handles loading and managing agent configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Agent configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    pub default_ttl_ms: u64,
    /// Local HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Base URL of the PeerConnect backend
    pub api_base_url: String,
    /// Bearer token sent with backend requests
    pub api_token: Option<String>,
    /// Backend request timeout in seconds
    pub request_timeout: u64,
    /// File backing the local key/value storage; in-memory when unset
    pub storage_path: Option<PathBuf>,
    /// Critical tier sync interval in seconds
    pub critical_sync_interval: u64,
    /// Regular tier sync interval in seconds
    pub regular_sync_interval: u64,
    /// Idle tier check interval in seconds
    pub idle_sync_interval: u64,
    /// Seconds without observed activity before the idle tier may run
    pub idle_threshold: u64,
    /// Predictions above this confidence trigger a prefetch
    pub prefetch_threshold: f64,
    /// Maximum concurrent requests per preload batch
    pub max_concurrent_preloads: usize,
    /// Run background sync on a dedicated worker thread
    pub sync_worker: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 500)
    /// - `DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `API_BASE_URL` - Backend base URL (default: http://localhost:5000)
    /// - `API_TOKEN` - Bearer token (default: none)
    /// - `REQUEST_TIMEOUT_SECS` - Backend request timeout (default: 10)
    /// - `STORAGE_PATH` - Local storage file (default: in-memory)
    /// - `CRITICAL_SYNC_INTERVAL` / `REGULAR_SYNC_INTERVAL` / `IDLE_SYNC_INTERVAL`
    ///   - Tier intervals in seconds (default: 30 / 120 / 300)
    /// - `IDLE_THRESHOLD` - Inactivity seconds before idle sync (default: 60)
    /// - `PREFETCH_THRESHOLD` - Prediction confidence cut-off (default: 0.7)
    /// - `MAX_CONCURRENT_PRELOADS` - Preload batch width (default: 4)
    /// - `SYNC_WORKER` - Dedicated sync worker thread (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_parse("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl_ms: env_parse("DEFAULT_TTL_MS").unwrap_or(defaults.default_ttl_ms),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: env_parse("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            api_base_url: env::var("API_BASE_URL").unwrap_or(defaults.api_base_url),
            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            request_timeout: env_parse("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout),
            storage_path: env::var("STORAGE_PATH")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            critical_sync_interval: env_parse("CRITICAL_SYNC_INTERVAL")
                .unwrap_or(defaults.critical_sync_interval),
            regular_sync_interval: env_parse("REGULAR_SYNC_INTERVAL")
                .unwrap_or(defaults.regular_sync_interval),
            idle_sync_interval: env_parse("IDLE_SYNC_INTERVAL")
                .unwrap_or(defaults.idle_sync_interval),
            idle_threshold: env_parse("IDLE_THRESHOLD").unwrap_or(defaults.idle_threshold),
            prefetch_threshold: env_parse("PREFETCH_THRESHOLD")
                .unwrap_or(defaults.prefetch_threshold),
            max_concurrent_preloads: env_parse("MAX_CONCURRENT_PRELOADS")
                .unwrap_or(defaults.max_concurrent_preloads),
            sync_worker: env_parse("SYNC_WORKER").unwrap_or(defaults.sync_worker),
        }
    }

    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 500,
            default_ttl_ms: 300_000,
            server_port: 3000,
            cleanup_interval: 1,
            api_base_url: "http://localhost:5000".to_string(),
            api_token: None,
            request_timeout: 10,
            storage_path: None,
            critical_sync_interval: 30,
            regular_sync_interval: 120,
            idle_sync_interval: 300,
            idle_threshold: 60,
            prefetch_threshold: 0.7,
            max_concurrent_preloads: 4,
            sync_worker: true,
        }
    }
}
