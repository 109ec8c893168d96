//! API Routes
//!
//! Configures the Axum router with all agent endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, invalidate_handler, predictions_handler,
    preload_page_handler, preload_user_handler, realtime_event_handler, set_handler,
    stats_handler, sync_status_handler, sync_tier_handler, update_handler, user_event_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: any origin, so browser clients on other ports can read through
/// - Tracing: logs every request
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", put(set_handler).patch(update_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/preload/user/:user_id", post(preload_user_handler))
        .route("/preload/page", post(preload_page_handler))
        .route("/sync/status", get(sync_status_handler))
        .route("/sync/:tier", post(sync_tier_handler))
        .route("/events/user", post(user_event_handler))
        .route("/events/realtime", post(realtime_event_handler))
        .route("/predictions", get(predictions_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{self, CacheManager};
    use crate::preload::testing::MockFetcher;
    use crate::preload::{PreloadSettings, Preloader};
    use crate::storage::LocalStorage;
    use crate::sync::{SyncManager, SyncSettings};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let cache = cache::shared(CacheManager::new(100, Duration::from_secs(300)));
        let fetcher = Arc::new(MockFetcher::new());
        let preloader = Preloader::new(
            cache.clone(),
            fetcher.clone(),
            PreloadSettings::default().without_delays(),
        );
        let sync = SyncManager::new(
            cache.clone(),
            fetcher,
            preloader.clone(),
            LocalStorage::in_memory(),
            SyncSettings::default(),
        );
        create_router(AppState::new(cache, preloader, sync))
    }

    async fn status_of(app: Router, request: Request<Body>) -> StatusCode {
        app.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(create_test_app(), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let request = Request::builder()
            .uri("/stats")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(create_test_app(), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_endpoint() {
        let request = Request::builder()
            .method("PUT")
            .uri("/cache")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"key":"test","value":{"hello":"world"}}"#))
            .unwrap();
        assert_eq!(status_of(create_test_app(), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let request = Request::builder()
            .uri("/cache/nonexistent")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            status_of(create_test_app(), request).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_sync_status_is_not_shadowed_by_tier_route() {
        let request = Request::builder()
            .uri("/sync/status")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(create_test_app(), request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/cache")
            .header("origin", "http://localhost:5173")
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .unwrap();
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key("access-control-allow-origin"));
    }
}
