//! In-process fetcher for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, SyncError};
use crate::preload::DataFetcher;

/// Answers `{"endpoint": <path>}` for every endpoint except the failing ones.
#[derive(Default)]
pub struct MockFetcher {
    latency: Duration,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing(self, endpoint: &str) -> Self {
        self.set_failing(endpoint, true);
        self
    }

    pub fn set_failing(&self, endpoint: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(endpoint.to_string());
        } else {
            set.remove(endpoint);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == endpoint).count()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataFetcher for MockFetcher {
    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(endpoint) {
            return Err(SyncError::HttpStatus {
                status: 503,
                endpoint: endpoint.to_string(),
            });
        }
        Ok(json!({ "endpoint": endpoint }))
    }
}
