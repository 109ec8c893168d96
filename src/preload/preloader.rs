//! Preloader
//!
//! Priority-queued fetch scheduler that fills the cache ahead of navigation.
//! Queued requests run in batches of bounded width; inside a batch every
//! request waits its tier delay, then all run concurrently and settle
//! independently.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, SetOptions, SharedCache};
use crate::error::Result;
use crate::preload::catalog;
use crate::preload::{DataFetcher, PreloadPriority, PreloadRequest, PreloadSettings};

// == Preloaded Data ==
/// A fetched result with its freshness window.
#[derive(Debug, Clone)]
pub struct PreloadedData {
    pub value: Value,
    /// Unix milliseconds
    pub fetched_at: u64,
    pub ttl: Duration,
}

impl PreloadedData {
    pub fn is_fresh_at(&self, now: u64) -> bool {
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        now.saturating_sub(self.fetched_at) < ttl_ms
    }
}

// == Reports ==
/// Outcome of a critical preload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadReport {
    /// Immediate requests that succeeded
    pub succeeded: usize,
    /// Immediate requests that failed
    pub failed: usize,
    /// Requests handed to the background queue
    pub queued: usize,
}

/// Outcome of one queue drain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueReport {
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Point-in-time preloader counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreloadStats {
    pub queued: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub preloaded: usize,
    pub completed: u64,
    pub failed: u64,
    pub processing: bool,
}

#[derive(Debug)]
struct QueuedRequest {
    seq: u64,
    request: PreloadRequest,
}

struct Inner {
    cache: SharedCache,
    fetcher: Arc<dyn DataFetcher>,
    settings: PreloadSettings,
    queue: Mutex<Vec<QueuedRequest>>,
    /// Keys queued or being fetched
    pending: Mutex<HashSet<String>>,
    preloaded: RwLock<HashMap<String, PreloadedData>>,
    processing: AtomicBool,
    next_seq: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicU64,
    failed: AtomicU64,
}

// == Preloader ==
/// Cheap to clone; clones share one queue and result map.
#[derive(Clone)]
pub struct Preloader {
    inner: Arc<Inner>,
}

impl Preloader {
    pub fn new(cache: SharedCache, fetcher: Arc<dyn DataFetcher>, settings: PreloadSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                settings,
                queue: Mutex::new(Vec::new()),
                pending: Mutex::new(HashSet::new()),
                preloaded: RwLock::new(HashMap::new()),
                processing: AtomicBool::new(false),
                next_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &PreloadSettings {
        &self.inner.settings
    }

    // == Critical Preload ==
    /// Preloads the data every signed-in page needs.
    ///
    /// Immediate requests run concurrently and are awaited; the rest are
    /// queued and drained in the background.
    pub async fn preload_critical_data(&self, user_id: &str) -> PreloadReport {
        let (immediate, deferred): (Vec<_>, Vec<_>) = catalog::critical_requests(user_id)
            .into_iter()
            .partition(|r| r.priority == PreloadPriority::Immediate);

        let mut report = PreloadReport::default();

        let mut set = JoinSet::new();
        for request in immediate {
            let this = self.clone();
            set.spawn(async move {
                let outcome = this.execute(&request).await;
                (request, outcome)
            });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(_))) => report.succeeded += 1,
                Ok((request, Err(e))) => {
                    warn!("Immediate preload {} failed: {}", request.endpoint, e);
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("Immediate preload task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }

        for request in deferred {
            if self.enqueue(request).await {
                report.queued += 1;
            }
        }
        self.spawn_processing();

        info!(
            "Critical preload for user {}: {} ok, {} failed, {} queued",
            user_id, report.succeeded, report.failed, report.queued
        );
        report
    }

    // == Page Preload ==
    /// Queues the data behind `route` and starts draining in the background.
    ///
    /// Returns the number of requests queued.
    pub async fn preload_page_data(&self, route: &str) -> usize {
        let mut queued = 0;
        for request in catalog::page_requests(route) {
            if self.enqueue(request).await {
                queued += 1;
            }
        }
        debug!("Page preload {}: {} requests queued", route, queued);
        if queued > 0 {
            self.spawn_processing();
        }
        queued
    }

    /// Queues a single endpoint under its catalog key and tags, or keyed by
    /// its path when no page uses it.
    pub async fn prefetch_endpoint(&self, endpoint: &str, priority: PreloadPriority) -> bool {
        let request = catalog::endpoint_request(endpoint, priority);
        let queued = self.enqueue(request).await;
        if queued {
            self.spawn_processing();
        }
        queued
    }

    // == Get Preloaded Data ==
    /// Returns a preloaded result younger than its TTL. Never fetches.
    pub async fn get_preloaded_data(&self, key: &str) -> Option<Value> {
        let preloaded = self.inner.preloaded.read().await;
        preloaded
            .get(key)
            .filter(|data| data.is_fresh_at(current_timestamp_ms()))
            .map(|data| data.value.clone())
    }

    // == Queue ==
    /// Adds a request unless its key is queued, in flight, or still fresh.
    pub async fn enqueue(&self, request: PreloadRequest) -> bool {
        {
            let preloaded = self.inner.preloaded.read().await;
            if preloaded
                .get(&request.key)
                .is_some_and(|data| data.is_fresh_at(current_timestamp_ms()))
            {
                return false;
            }
        }

        {
            let mut pending = self.inner.pending.lock().await;
            if !pending.insert(request.key.clone()) {
                return false;
            }
        }

        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner.queue.lock().await.push(QueuedRequest { seq, request });
        true
    }

    pub async fn queue_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Highest-priority requests first, FIFO within a tier.
    async fn take_batch(&self) -> Vec<PreloadRequest> {
        let mut queue = self.inner.queue.lock().await;
        queue.sort_by_key(|q| (q.request.priority, q.seq));
        let width = self.inner.settings.max_concurrent.max(1).min(queue.len());
        queue.drain(..width).map(|q| q.request).collect()
    }

    fn spawn_processing(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            this.process_queue().await;
        });
    }

    // == Process Queue ==
    /// Drains the queue batch by batch.
    ///
    /// Only one drain runs at a time; a concurrent call returns an empty
    /// report immediately.
    pub async fn process_queue(&self) -> QueueReport {
        let mut report = QueueReport::default();

        loop {
            if self
                .inner
                .processing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return report;
            }

            loop {
                let batch = self.take_batch().await;
                if batch.is_empty() {
                    break;
                }
                if report.batches > 0 && !self.inner.settings.batch_pause.is_zero() {
                    tokio::time::sleep(self.inner.settings.batch_pause).await;
                }
                self.run_batch(batch, &mut report).await;
                report.batches += 1;
            }

            self.inner.processing.store(false, Ordering::Release);

            // Requests queued between the last take and the flag reset
            if self.queue_len().await == 0 {
                break;
            }
        }

        if report.batches > 0 {
            debug!(
                "Preload queue drained: {} batches, {} ok, {} failed",
                report.batches, report.succeeded, report.failed
            );
        }
        report
    }

    async fn run_batch(&self, batch: Vec<PreloadRequest>, report: &mut QueueReport) {
        let mut set = JoinSet::new();
        for request in batch {
            let this = self.clone();
            let delay = self.inner.settings.delay_for(request.priority);
            set.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let outcome = this.execute(&request).await;
                (request, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(_))) => report.succeeded += 1,
                Ok((request, Err(e))) => {
                    warn!("Preload {} failed: {}", request.endpoint, e);
                    report.failed += 1;
                }
                Err(e) => {
                    warn!("Preload task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }
    }

    // == Execute ==
    /// Fetches one request and records the result in the preload map and
    /// the cache.
    async fn execute(&self, request: &PreloadRequest) -> Result<Value> {
        let now_in_flight = self.inner.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner
            .peak_in_flight
            .fetch_max(now_in_flight, Ordering::AcqRel);

        let outcome = self.inner.fetcher.fetch(&request.endpoint).await;

        self.inner.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.inner.pending.lock().await.remove(&request.key);

        match &outcome {
            Ok(value) => {
                self.inner.completed.fetch_add(1, Ordering::Relaxed);
                self.inner.preloaded.write().await.insert(
                    request.key.clone(),
                    PreloadedData {
                        value: value.clone(),
                        fetched_at: current_timestamp_ms(),
                        ttl: request.ttl,
                    },
                );

                let options = SetOptions {
                    ttl: Some(request.ttl),
                    priority: Some(request.priority.cache_priority()),
                    tags: Some(request.tags.iter().cloned().collect()),
                    compress: None,
                };
                self.inner
                    .cache
                    .write()
                    .await
                    .set(request.key.clone(), value.clone(), options);
            }
            Err(_) => {
                self.inner.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        outcome
    }

    // == Maintenance ==
    /// Drops queued work and preloaded results, e.g. on logout.
    ///
    /// Fetches already in flight still complete into the cache.
    pub async fn clear(&self) {
        let mut queue = self.inner.queue.lock().await;
        let mut pending = self.inner.pending.lock().await;
        for queued in queue.drain(..) {
            pending.remove(&queued.request.key);
        }
        drop(pending);
        drop(queue);
        self.inner.preloaded.write().await.clear();
    }

    /// Waits until the queue is empty and no drain is running.
    pub async fn wait_idle(&self) {
        loop {
            let busy = self.inner.processing.load(Ordering::Acquire)
                || self.inner.in_flight.load(Ordering::Acquire) > 0
                || self.queue_len().await > 0;
            if !busy {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn stats(&self) -> PreloadStats {
        PreloadStats {
            queued: self.queue_len().await,
            in_flight: self.inner.in_flight.load(Ordering::Acquire),
            peak_in_flight: self.inner.peak_in_flight.load(Ordering::Acquire),
            preloaded: self.inner.preloaded.read().await.len(),
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
            processing: self.inner.processing.load(Ordering::Acquire),
        }
    }
}
