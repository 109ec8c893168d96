//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired cache entries so they
//! stop counting against capacity before anyone reads them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Spawns a task that calls `cleanup_expired` every `cleanup_interval_secs`.
///
/// The returned handle is aborted during graceful shutdown.
pub fn spawn_cleanup_task(cache: SharedCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.write().await.cleanup_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheManager, SetOptions};
    use serde_json::json;

    fn cache() -> SharedCache {
        cache::shared(CacheManager::new(100, Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let cache = cache();
        cache.write().await.set(
            "expire_soon",
            json!("value"),
            SetOptions::new().ttl(Duration::from_millis(200)),
        );

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        {
            let guard = cache.read().await;
            assert!(!guard.contains("expire_soon"));
            assert_eq!(guard.stats().expirations, 1);
            assert_eq!(guard.stats().misses, 0);
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let cache = cache();
        cache.write().await.set(
            "long_lived",
            json!({"v": 1}),
            SetOptions::new().ttl(Duration::from_secs(3600)),
        );

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.write().await.get("long_lived"), Some(json!({"v": 1})));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(cache(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
