//! Background Sync Scheduler
//!
//! Owns the sync loops and their task handles. Loops run on a dedicated
//! worker thread with its own runtime when one can be started, otherwise as
//! timer tasks on the caller's runtime.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::sync::{SyncManager, SyncTier};

const MIN_TICK: Duration = Duration::from_millis(10);

// == Execution Mode ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Loops run on a dedicated thread
    Worker,
    /// Loops share the caller's runtime
    Timer,
}

struct WorkerThread {
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

// == Sync Scheduler ==
/// Handle to the running sync loops. Dropping it stops them.
pub struct SyncScheduler {
    mode: ExecutionMode,
    tasks: Vec<JoinHandle<()>>,
    worker: Option<WorkerThread>,
}

impl SyncScheduler {
    /// Starts the loops, preferring a worker thread when the manager's
    /// settings ask for one.
    pub fn start(manager: SyncManager) -> Result<Self> {
        if manager.settings().prefer_worker {
            match Self::start_worker(manager.clone()) {
                Ok(scheduler) => return Ok(scheduler),
                Err(e) => warn!("Sync worker unavailable, falling back to timers: {}", e),
            }
        }
        Self::start_timers(manager)
    }

    fn start_timers(manager: SyncManager) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| SyncError::Internal(format!("no runtime for sync timers: {}", e)))?;
        let tasks = spawn_loops(&handle, manager);
        Ok(Self {
            mode: ExecutionMode::Timer,
            tasks,
            worker: None,
        })
    }

    fn start_worker(manager: SyncManager) -> std::io::Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<std::io::Result<()>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("peer-sync-worker".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                runtime.block_on(async move {
                    let tasks = spawn_loops(&Handle::current(), manager);
                    let _ = shutdown_rx.await;
                    for task in &tasks {
                        task.abort();
                    }
                });
                debug!("Sync worker thread exiting");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                mode: ExecutionMode::Worker,
                tasks: Vec::new(),
                worker: Some(WorkerThread {
                    shutdown: Some(shutdown_tx),
                    thread: Some(thread),
                }),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "sync worker exited during startup",
                ))
            }
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Stops every loop. In-flight fetches are cancelled.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(mut worker) = self.worker.take() {
            if let Some(shutdown) = worker.shutdown.take() {
                let _ = shutdown.send(());
            }
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    warn!("Sync worker thread panicked");
                }
            }
        }
        info!("Background sync stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if !self.tasks.is_empty() || self.worker.is_some() {
            self.stop();
        }
    }
}

/// Spawns the tier, idle and retry loops on `handle`.
fn spawn_loops(handle: &Handle, manager: SyncManager) -> Vec<JoinHandle<()>> {
    let settings = manager.settings().clone();
    let mut tasks = Vec::new();

    for tier in [SyncTier::Critical, SyncTier::Regular] {
        let manager = manager.clone();
        let interval = settings.interval_for(tier);
        tasks.push(handle.spawn(async move {
            info!("Starting {} sync loop every {:?}", tier, interval);
            let mut ticker = ticker(interval);
            loop {
                ticker.tick().await;
                manager.sync_tier(tier).await;
            }
        }));
    }

    {
        let manager = manager.clone();
        let interval = settings.idle_interval;
        tasks.push(handle.spawn(async move {
            let mut ticker = ticker(interval);
            loop {
                ticker.tick().await;
                if manager.run_idle().await.is_none() {
                    debug!("User active, idle sync skipped");
                }
            }
        }));
    }

    let interval = settings.retry_check_interval;
    tasks.push(handle.spawn(async move {
        let mut ticker = ticker(interval);
        loop {
            ticker.tick().await;
            let report = manager.retry_failed().await;
            if report.synced > 0 {
                info!("Retried syncs recovered {} endpoints", report.synced);
            }
        }
    }));

    tasks
}

/// Interval that fires immediately, then every `period` (at least 10 ms).
fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period.max(MIN_TICK));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheManager, SharedCache};
    use crate::preload::testing::MockFetcher;
    use crate::preload::{PreloadSettings, Preloader};
    use crate::storage::LocalStorage;
    use crate::sync::SyncSettings;
    use std::sync::Arc;

    fn manager(prefer_worker: bool) -> (SyncManager, SharedCache, Arc<MockFetcher>) {
        let cache = cache::shared(CacheManager::new(100, Duration::from_secs(300)));
        let fetcher = Arc::new(MockFetcher::new());
        let preloader = Preloader::new(
            cache.clone(),
            fetcher.clone(),
            PreloadSettings::default().without_delays(),
        );
        let settings = SyncSettings {
            critical_interval: Duration::from_millis(50),
            regular_interval: Duration::from_secs(60),
            idle_interval: Duration::from_secs(60),
            retry_check_interval: Duration::from_millis(50),
            prefer_worker,
            ..SyncSettings::default()
        };
        let manager = SyncManager::new(
            cache.clone(),
            fetcher.clone(),
            preloader,
            LocalStorage::in_memory(),
            settings,
        );
        (manager, cache, fetcher)
    }

    #[tokio::test]
    async fn test_timer_mode_runs_critical_tier() {
        let (manager, cache, fetcher) = manager(false);

        let scheduler = manager.start().unwrap();
        assert_eq!(scheduler.mode(), ExecutionMode::Timer);

        tokio::time::sleep(Duration::from_millis(180)).await;
        assert!(fetcher.call_count("/api/notifications") >= 2);
        assert!(cache.write().await.get("notifications").is_some());
        assert_eq!(manager.status().await.mode, Some(ExecutionMode::Timer));

        scheduler.shutdown();
        let calls = fetcher.call_count("/api/notifications");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fetcher.call_count("/api/notifications"), calls);
    }

    #[tokio::test]
    async fn test_worker_mode_runs_on_own_thread() {
        let (manager, cache, fetcher) = manager(true);

        let scheduler = manager.start().unwrap();
        assert_eq!(scheduler.mode(), ExecutionMode::Worker);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(fetcher.call_count("/api/notifications") >= 1);
        assert!(cache.write().await.get("notifications").is_some());

        drop(scheduler);
        let calls = fetcher.call_count("/api/notifications");
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fetcher.call_count("/api/notifications"), calls);
    }
}
