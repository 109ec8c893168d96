//! Sync Manager
//!
//! Keeps cached backend data fresh without user action. Three tiers refresh
//! on their own cadence, failed endpoints retry with exponential backoff, and
//! a predictive model turns observed navigation into prefetch hints.
//!
//! Nothing here surfaces errors to callers: failures are logged, recorded and
//! retried.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Local, Timelike, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, SetOptions, SharedCache, UpdateOptions};
use crate::error::Result;
use crate::preload::{DataFetcher, PreloadPriority, Preloader};
use crate::storage::{LocalStorage, LAST_BACKGROUND_SYNC_KEY, PREDICTIVE_MODEL_KEY};
use crate::tasks::{ExecutionMode, SyncScheduler};
use crate::sync::{
    FailureRecord, Prediction, PredictionKind, PredictionTrigger, PredictiveModel,
    RealtimeEvent, SyncTarget, SyncTier, UserEvent,
};

/// Hot keys considered on each idle tick.
const HOT_REFRESH_LIMIT: usize = 5;

// == Sync State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Syncing,
    /// Last run left failures waiting for retry
    Backoff,
}

// == Sync Settings ==
/// Timing knobs for the manager and its loops.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub critical_interval: Duration,
    pub regular_interval: Duration,
    pub idle_interval: Duration,
    /// Quiet time before the idle tier may run
    pub idle_threshold: Duration,
    /// How often due retries are checked
    pub retry_check_interval: Duration,
    /// Predictions above this confidence trigger a prefetch
    pub prefetch_threshold: f64,
    /// Run the loops on a dedicated worker thread when possible
    pub prefer_worker: bool,
}

impl SyncSettings {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            critical_interval: SyncTier::Critical.interval(config),
            regular_interval: SyncTier::Regular.interval(config),
            idle_interval: SyncTier::Idle.interval(config),
            idle_threshold: Duration::from_secs(config.idle_threshold),
            prefetch_threshold: config.prefetch_threshold,
            prefer_worker: config.sync_worker,
            ..Self::default()
        }
    }

    pub fn interval_for(&self, tier: SyncTier) -> Duration {
        match tier {
            SyncTier::Critical => self.critical_interval,
            SyncTier::Regular => self.regular_interval,
            SyncTier::Idle => self.idle_interval,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            critical_interval: Duration::from_secs(30),
            regular_interval: Duration::from_secs(120),
            idle_interval: Duration::from_secs(300),
            idle_threshold: Duration::from_secs(60),
            retry_check_interval: Duration::from_secs(5),
            prefetch_threshold: 0.7,
            prefer_worker: true,
        }
    }
}

// == Reports ==
/// Outcome of one tier run or retry pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    /// Endpoints still inside their backoff window
    pub skipped: usize,
    /// Cache entries dropped by refresh invalidation
    pub invalidated: usize,
}

/// Snapshot for status endpoints and logs.
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Set once the background loops are started
    pub mode: Option<ExecutionMode>,
    pub last_sync: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub pending_failures: Vec<FailureRecord>,
}

struct Inner {
    cache: SharedCache,
    fetcher: Arc<dyn DataFetcher>,
    preloader: Preloader,
    storage: StdMutex<LocalStorage>,
    settings: SyncSettings,
    model: RwLock<PredictiveModel>,
    failures: Mutex<HashMap<String, FailureRecord>>,
    state: StdMutex<SyncState>,
    active_runs: AtomicUsize,
    /// Unix ms, 0 = never
    last_sync: AtomicU64,
    last_activity: AtomicU64,
    last_route: StdMutex<Option<String>>,
    mode: StdMutex<Option<ExecutionMode>>,
}

// == Sync Manager ==
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncManager {
    inner: Arc<Inner>,
}

impl SyncManager {
    /// Builds a manager, restoring the predictive model and last sync time
    /// from storage. Unreadable state starts fresh.
    pub fn new(
        cache: SharedCache,
        fetcher: Arc<dyn DataFetcher>,
        preloader: Preloader,
        storage: LocalStorage,
        settings: SyncSettings,
    ) -> Self {
        let model: PredictiveModel = storage.get_json(PREDICTIVE_MODEL_KEY).unwrap_or_default();
        let last_sync: u64 = storage.get_json(LAST_BACKGROUND_SYNC_KEY).unwrap_or(0);
        debug!(
            "Sync manager restored (model empty: {}, last sync: {})",
            model.is_empty(),
            last_sync
        );

        Self {
            inner: Arc::new(Inner {
                cache,
                fetcher,
                preloader,
                storage: StdMutex::new(storage),
                settings,
                model: RwLock::new(model),
                failures: Mutex::new(HashMap::new()),
                state: StdMutex::new(SyncState::Idle),
                active_runs: AtomicUsize::new(0),
                last_sync: AtomicU64::new(last_sync),
                last_activity: AtomicU64::new(current_timestamp_ms()),
                last_route: StdMutex::new(None),
                mode: StdMutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    pub fn preloader(&self) -> &Preloader {
        &self.inner.preloader
    }

    // == State ==
    pub fn state(&self) -> SyncState {
        *lock(&self.inner.state)
    }

    fn set_state(&self, state: SyncState) {
        let mut current = lock(&self.inner.state);
        if *current != state {
            debug!("Sync state {:?} -> {:?}", *current, state);
            *current = state;
        }
    }

    fn begin_run(&self) {
        self.inner.active_runs.fetch_add(1, Ordering::AcqRel);
        self.set_state(SyncState::Syncing);
    }

    async fn end_run(&self) {
        let remaining = self.inner.active_runs.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let has_failures = !self.inner.failures.lock().await.is_empty();
            self.set_state(if has_failures {
                SyncState::Backoff
            } else {
                SyncState::Idle
            });
        }
    }

    // == Sync Tier ==
    /// Refreshes every endpoint of `tier` that is not waiting out a backoff.
    pub async fn sync_tier(&self, tier: SyncTier) -> SyncReport {
        self.begin_run();
        let mut report = SyncReport::default();
        let now = current_timestamp_ms();

        for target in tier.targets() {
            self.sync_target(tier, target, now, &mut report).await;
        }

        self.inner
            .last_sync
            .store(current_timestamp_ms(), Ordering::Release);
        self.persist().await;
        self.end_run().await;

        if report.failed > 0 {
            warn!(
                "{} sync: {} ok, {} failed, {} in backoff",
                tier, report.synced, report.failed, report.skipped
            );
        } else {
            debug!(
                "{} sync: {} ok, {} in backoff",
                tier, report.synced, report.skipped
            );
        }
        report
    }

    /// Refreshes `target` unless it is waiting out a backoff, tallying the
    /// outcome into `report`.
    async fn sync_target(&self, tier: SyncTier, target: &SyncTarget, now: u64, report: &mut SyncReport) {
        let waiting = self
            .inner
            .failures
            .lock()
            .await
            .get(target.endpoint)
            .is_some_and(|record| !record.is_due(now));
        if waiting {
            report.skipped += 1;
            return;
        }

        match self.refresh_target(tier, target).await {
            Ok(invalidated) => {
                report.synced += 1;
                report.invalidated += invalidated;
            }
            Err(_) => report.failed += 1,
        }
    }

    /// Fetches one target into the cache, tracking failure state.
    async fn refresh_target(&self, tier: SyncTier, target: &SyncTarget) -> Result<usize> {
        match self.inner.fetcher.fetch(target.endpoint).await {
            Ok(value) => {
                let options = UpdateOptions::new()
                    .with_set(SetOptions {
                        ttl: Some(Duration::from_secs(target.ttl_secs)),
                        priority: Some(tier.cache_priority()),
                        tags: Some(target.tags.iter().map(|t| t.to_string()).collect()),
                        compress: None,
                    })
                    .invalidate(target.invalidates.iter().copied());
                let invalidated = self
                    .inner
                    .cache
                    .write()
                    .await
                    .update(target.key, value, options);

                if self.inner.failures.lock().await.remove(target.endpoint).is_some() {
                    info!("Sync of {} recovered", target.endpoint);
                }
                Ok(invalidated)
            }
            Err(e) => {
                let now = current_timestamp_ms();
                let mut failures = self.inner.failures.lock().await;
                let record = failures
                    .entry(target.endpoint.to_string())
                    .and_modify(|record| record.fail(e.to_string(), now))
                    .or_insert_with(|| FailureRecord::first(target.endpoint, e.to_string(), now));
                warn!(
                    "Sync of {} failed (attempt {}), retry in {}s: {}",
                    target.endpoint,
                    record.attempts,
                    record.next_retry_at.saturating_sub(now) / 1000,
                    e
                );
                Err(e)
            }
        }
    }

    // == Retry ==
    /// Retries endpoints whose backoff has elapsed.
    pub async fn retry_failed(&self) -> SyncReport {
        let now = current_timestamp_ms();
        let due: Vec<String> = self
            .inner
            .failures
            .lock()
            .await
            .values()
            .filter(|record| record.is_due(now))
            .map(|record| record.endpoint.clone())
            .collect();

        let mut report = SyncReport::default();
        if due.is_empty() {
            return report;
        }

        self.begin_run();
        for endpoint in due {
            let Some((tier, target)) = find_target(&endpoint) else {
                self.inner.failures.lock().await.remove(&endpoint);
                continue;
            };
            match self.refresh_target(tier, target).await {
                Ok(invalidated) => {
                    report.synced += 1;
                    report.invalidated += invalidated;
                }
                Err(_) => report.failed += 1,
            }
        }
        self.end_run().await;
        report
    }

    pub async fn pending_failures(&self) -> Vec<FailureRecord> {
        let mut records: Vec<FailureRecord> =
            self.inner.failures.lock().await.values().cloned().collect();
        records.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        records
    }

    // == Observe ==
    /// Feeds a user event to the model. A route change also prefetches what
    /// the model expects next.
    ///
    /// Returns the number of prefetches triggered.
    pub async fn observe(&self, event: UserEvent) -> usize {
        self.observe_at(event, Local::now().hour()).await
    }

    pub async fn observe_at(&self, event: UserEvent, hour: u32) -> usize {
        self.inner
            .last_activity
            .store(current_timestamp_ms(), Ordering::Release);
        self.inner.model.write().await.observe(&event, hour);

        let UserEvent::RouteChange { to, .. } = event else {
            return 0;
        };
        *lock(&self.inner.last_route) = Some(to.clone());

        let trigger = PredictionTrigger {
            route: Some(to),
            hour,
        };
        let predictions = self.generate_predictions(&trigger).await;
        self.apply_predictions(&predictions).await
    }

    /// True once no activity has been observed for the idle threshold.
    pub fn is_user_idle(&self) -> bool {
        let last = self.inner.last_activity.load(Ordering::Acquire);
        let threshold = self.inner.settings.idle_threshold.as_millis() as u64;
        current_timestamp_ms().saturating_sub(last) >= threshold
    }

    pub fn last_route(&self) -> Option<String> {
        lock(&self.inner.last_route).clone()
    }

    // == Predictions ==
    pub async fn generate_predictions(&self, trigger: &PredictionTrigger) -> Vec<Prediction> {
        self.inner.model.read().await.generate_predictions(trigger)
    }

    /// Prefetches every prediction above the confidence threshold.
    ///
    /// Returns the number of predictions that queued work.
    pub async fn apply_predictions(&self, predictions: &[Prediction]) -> usize {
        let threshold = self.inner.settings.prefetch_threshold;
        let mut triggered = 0;

        for prediction in predictions.iter().filter(|p| p.confidence > threshold) {
            let queued = match prediction.kind {
                PredictionKind::Route => {
                    self.inner.preloader.preload_page_data(&prediction.target).await > 0
                }
                PredictionKind::Data => {
                    self.inner
                        .preloader
                        .prefetch_endpoint(&prediction.target, PreloadPriority::Low)
                        .await
                }
            };
            if queued {
                debug!(
                    "Prefetching {} ({:.2} confidence)",
                    prediction.target, prediction.confidence
                );
                triggered += 1;
            }
        }
        triggered
    }

    /// Idle-tier work: refresh background data and act on predictions for
    /// the last known route. Skipped while the user is active.
    pub async fn run_idle(&self) -> Option<SyncReport> {
        if !self.is_user_idle() {
            return None;
        }
        let mut report = self.sync_tier(SyncTier::Idle).await;
        self.refresh_hot_keys(&mut report).await;

        let trigger = PredictionTrigger {
            route: self.last_route(),
            hour: Local::now().hour(),
        };
        let predictions = self.generate_predictions(&trigger).await;
        self.apply_predictions(&predictions).await;
        Some(report)
    }

    /// Refetches the most accessed cached keys that belong to the critical
    /// or regular tier, ahead of their next scheduled sync.
    async fn refresh_hot_keys(&self, report: &mut SyncReport) {
        let hot = self.inner.cache.read().await.hot_keys(HOT_REFRESH_LIMIT);
        let targets: Vec<_> = hot
            .iter()
            .filter_map(|key| find_target_by_key(key))
            .filter(|(tier, _)| *tier != SyncTier::Idle)
            .collect();
        if targets.is_empty() {
            return;
        }

        self.begin_run();
        let now = current_timestamp_ms();
        for (tier, target) in &targets {
            self.sync_target(*tier, target, now, report).await;
        }
        self.end_run().await;
        debug!("Refreshed {} hot keys", targets.len());
    }

    // == Realtime Events ==
    /// Drops cache entries a server push made stale and refetches the
    /// affected endpoints.
    ///
    /// Returns the number of entries invalidated.
    pub async fn handle_realtime_event(&self, event: RealtimeEvent) -> usize {
        let invalidated = self
            .inner
            .cache
            .write()
            .await
            .invalidate_by_tags(event.invalidated_tags());
        debug!("Realtime {:?} invalidated {} entries", event, invalidated);

        for endpoint in event.refresh_endpoints() {
            if let Some((tier, target)) = find_target(endpoint) {
                // Failures land in the retry table.
                let _ = self.refresh_target(tier, target).await;
            }
        }
        invalidated
    }

    // == Background Loops ==
    /// Starts the tier, idle and retry loops.
    ///
    /// The returned scheduler owns the loops; dropping it stops them.
    pub fn start(&self) -> Result<SyncScheduler> {
        let scheduler = SyncScheduler::start(self.clone())?;
        *lock(&self.inner.mode) = Some(scheduler.mode());
        info!("Background sync started in {:?} mode", scheduler.mode());
        Ok(scheduler)
    }

    // == Persistence ==
    /// Writes the model and last sync time to local storage. The file write
    /// runs on the blocking pool.
    pub async fn persist(&self) {
        let model = self.inner.model.read().await.clone();
        let last_sync = self.inner.last_sync.load(Ordering::Acquire);
        let inner = self.inner.clone();
        let written = tokio::task::spawn_blocking(move || {
            let mut storage = lock(&inner.storage);
            storage.set_json(PREDICTIVE_MODEL_KEY, &model);
            storage.set_json(LAST_BACKGROUND_SYNC_KEY, &last_sync);
        })
        .await;
        if let Err(e) = written {
            warn!("Persisting sync state failed: {}", e);
        }
    }

    pub async fn model(&self) -> PredictiveModel {
        self.inner.model.read().await.clone()
    }

    // == Status ==
    pub async fn status(&self) -> SyncStatus {
        let pending_failures = self.pending_failures().await;
        // Guards on the std mutexes must not live across an await.
        let mode = *lock(&self.inner.mode);
        SyncStatus {
            state: self.state(),
            mode,
            last_sync: millis_to_datetime(self.inner.last_sync.load(Ordering::Acquire)),
            last_activity: millis_to_datetime(self.inner.last_activity.load(Ordering::Acquire)),
            pending_failures,
        }
    }
}

/// Tier and target that refresh `endpoint`.
fn find_target(endpoint: &str) -> Option<(SyncTier, &'static SyncTarget)> {
    SyncTier::ALL.into_iter().find_map(|tier| {
        tier.targets()
            .iter()
            .find(|target| target.endpoint == endpoint)
            .map(|target| (tier, target))
    })
}

/// Tier and target whose data is cached under `key`.
fn find_target_by_key(key: &str) -> Option<(SyncTier, &'static SyncTarget)> {
    SyncTier::ALL.into_iter().find_map(|tier| {
        tier.targets()
            .iter()
            .find(|target| target.key == key)
            .map(|target| (tier, target))
    })
}

fn millis_to_datetime(ms: u64) -> Option<DateTime<Utc>> {
    if ms == 0 {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64)
}

/// Locks a std mutex, recovering the data if a holder panicked.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheManager};
    use crate::preload::testing::MockFetcher;
    use crate::preload::PreloadSettings;
    use serde_json::json;
    use tokio_test::assert_ok;

    struct Harness {
        manager: SyncManager,
        cache: SharedCache,
        fetcher: Arc<MockFetcher>,
    }

    fn harness_with(fetcher: MockFetcher, storage: LocalStorage, settings: SyncSettings) -> Harness {
        let cache = cache::shared(CacheManager::new(200, Duration::from_secs(300)));
        let fetcher = Arc::new(fetcher);
        let preloader = Preloader::new(
            cache.clone(),
            fetcher.clone(),
            PreloadSettings::default().without_delays(),
        );
        let manager = SyncManager::new(cache.clone(), fetcher.clone(), preloader, storage, settings);
        Harness {
            manager,
            cache,
            fetcher,
        }
    }

    fn harness(fetcher: MockFetcher) -> Harness {
        harness_with(fetcher, LocalStorage::in_memory(), SyncSettings::default())
    }

    #[tokio::test]
    async fn test_sync_tier_fills_cache() {
        let h = harness(MockFetcher::new());

        let report = h.manager.sync_tier(SyncTier::Critical).await;

        assert_eq!(report.synced, SyncTier::Critical.targets().len());
        assert_eq!(report.failed, 0);
        assert_eq!(h.manager.state(), SyncState::Idle);
        let mut cache = h.cache.write().await;
        assert_eq!(
            cache.get("notifications"),
            Some(json!({ "endpoint": "/api/notifications" }))
        );
        assert_eq!(
            cache.entry("conversations").unwrap().priority,
            crate::cache::Priority::Critical
        );
    }

    #[tokio::test]
    async fn test_failure_enters_backoff_and_is_skipped() {
        let h = harness(MockFetcher::new().failing("/api/friends"));

        let first = h.manager.sync_tier(SyncTier::Regular).await;
        assert_eq!(first.failed, 1);
        assert_eq!(first.synced, 1);
        assert_eq!(h.manager.state(), SyncState::Backoff);

        let failures = h.manager.pending_failures().await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].attempts, 1);

        // Inside the 30 s window the endpoint is not hit again.
        let second = h.manager.sync_tier(SyncTier::Regular).await;
        assert_eq!(second.skipped, 1);
        assert_eq!(h.fetcher.call_count("/api/friends"), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_to_idle() {
        let h = harness(MockFetcher::new().failing("/api/notifications"));
        h.manager.sync_tier(SyncTier::Critical).await;
        assert_eq!(h.manager.state(), SyncState::Backoff);

        // Nothing due yet.
        assert_eq!(h.manager.retry_failed().await, SyncReport::default());

        h.fetcher.set_failing("/api/notifications", false);
        h.manager
            .inner
            .failures
            .lock()
            .await
            .values_mut()
            .for_each(|record| record.next_retry_at = 0);

        let report = h.manager.retry_failed().await;
        assert_eq!(report.synced, 1);
        assert!(h.manager.pending_failures().await.is_empty());
        assert_eq!(h.manager.state(), SyncState::Idle);
        assert!(h.cache.write().await.get("notifications").is_some());
    }

    #[tokio::test]
    async fn test_regular_sync_invalidates_activity_lists() {
        let h = harness(MockFetcher::new());
        h.cache.write().await.set(
            "my-activities",
            json!([]),
            SetOptions::new().tags(["activity-list"]),
        );

        let report = h.manager.sync_tier(SyncTier::Regular).await;

        assert_eq!(report.invalidated, 1);
        let mut cache = h.cache.write().await;
        assert!(cache.get("my-activities").is_none());
        assert!(cache.get("activities").is_some());
    }

    #[tokio::test]
    async fn test_model_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        {
            let h = harness_with(MockFetcher::new(), LocalStorage::open(&path), SyncSettings::default());
            h.manager
                .observe_at(
                    UserEvent::FeatureUsed {
                        feature: "messaging".into(),
                    },
                    10,
                )
                .await;
            h.manager.sync_tier(SyncTier::Critical).await;
        }

        let h = harness_with(MockFetcher::new(), LocalStorage::open(&path), SyncSettings::default());
        assert_eq!(h.manager.model().await.feature_share("messaging"), 1.0);
        assert!(h.manager.status().await.last_sync.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_model_resets() {
        let mut storage = LocalStorage::in_memory();
        storage.set_item(PREDICTIVE_MODEL_KEY, "{\"routeTransitions\": 5");

        let h = harness_with(MockFetcher::new(), storage, SyncSettings::default());
        assert!(h.manager.model().await.is_empty());
        assert!(h.manager.status().await.last_sync.is_none());
    }

    #[tokio::test]
    async fn test_route_change_prefetches_likely_next_page() {
        let h = harness(MockFetcher::new());
        for _ in 0..4 {
            h.manager
                .observe_at(
                    UserEvent::RouteChange {
                        from: "/messages".into(),
                        to: "/friends".into(),
                    },
                    14,
                )
                .await;
            h.manager.preloader().wait_idle().await;
            h.manager.preloader().clear().await;
        }

        let triggered = h
            .manager
            .observe_at(
                UserEvent::RouteChange {
                    from: "/dashboard".into(),
                    to: "/messages".into(),
                },
                14,
            )
            .await;
        h.manager.preloader().wait_idle().await;

        assert!(triggered >= 1);
        assert!(h.fetcher.call_count("/api/friends") >= 1);
        assert_eq!(h.manager.last_route().as_deref(), Some("/messages"));
    }

    #[tokio::test]
    async fn test_low_confidence_predictions_are_ignored() {
        let h = harness(MockFetcher::new());
        let predictions = vec![Prediction {
            kind: PredictionKind::Data,
            target: "/api/activities".into(),
            confidence: 0.5,
        }];

        assert_eq!(h.manager.apply_predictions(&predictions).await, 0);
        h.manager.preloader().wait_idle().await;
        assert!(h.fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_data_prediction_uses_canonical_key_and_tags() {
        let h = harness(MockFetcher::new());
        let predictions = vec![Prediction {
            kind: PredictionKind::Data,
            target: "/api/notifications".into(),
            confidence: 0.9,
        }];

        assert_eq!(h.manager.apply_predictions(&predictions).await, 1);
        h.manager.preloader().wait_idle().await;
        {
            let cache = h.cache.read().await;
            let entry = cache.entry("notifications").unwrap();
            assert!(entry.tags.contains("notifications"));
            assert!(cache.entry("endpoint:/api/notifications").is_none());
        }

        let removed = h.manager.handle_realtime_event(RealtimeEvent::Notification).await;
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_realtime_event_invalidates_and_refetches() {
        let h = harness(MockFetcher::new());
        h.cache.write().await.set(
            "thread:9",
            json!({"messages": []}),
            SetOptions::new().tags(["messages"]),
        );

        let removed = h.manager.handle_realtime_event(RealtimeEvent::MessageReceived).await;

        assert_eq!(removed, 1);
        let mut cache = h.cache.write().await;
        assert!(cache.get("thread:9").is_none());
        assert!(cache.get("conversations").is_some());
    }

    #[tokio::test]
    async fn test_idle_tier_waits_for_quiet_user() {
        let settings = SyncSettings {
            idle_threshold: Duration::from_millis(50),
            ..SyncSettings::default()
        };
        let h = harness_with(MockFetcher::new(), LocalStorage::in_memory(), settings);

        h.manager.observe_at(UserEvent::Interaction, 9).await;
        assert!(h.manager.run_idle().await.is_none());

        tokio::time::sleep(Duration::from_millis(80)).await;
        let report = h.manager.run_idle().await;
        let report = assert_ok!(report.ok_or("idle tier did not run"));
        assert_eq!(report.synced, SyncTier::Idle.targets().len());
    }

    #[tokio::test]
    async fn test_idle_tick_refreshes_hot_keys() {
        let settings = SyncSettings {
            idle_threshold: Duration::from_millis(50),
            ..SyncSettings::default()
        };
        let h = harness_with(MockFetcher::new(), LocalStorage::in_memory(), settings);
        h.manager.sync_tier(SyncTier::Critical).await;
        {
            let mut cache = h.cache.write().await;
            for _ in 0..5 {
                cache.get("notifications");
            }
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        let report = h.manager.run_idle().await;
        let report = assert_ok!(report.ok_or("idle tier did not run"));

        assert_eq!(h.fetcher.call_count("/api/notifications"), 2);
        assert!(report.synced > SyncTier::Idle.targets().len());
        assert_eq!(h.manager.state(), SyncState::Idle);
    }

    #[tokio::test]
    async fn test_status_future_is_send() {
        fn assert_send<T: Send>(_: T) {}
        let h = harness_with(MockFetcher::new(), LocalStorage::in_memory(), SyncSettings::default());
        assert_send(h.manager.status());
        assert_send(h.manager.persist());
    }
}
