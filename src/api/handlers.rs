//! API Handlers
//!
//! HTTP request handlers for each agent endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Local, Timelike};
use tracing::debug;

use crate::cache::{self, CacheManager, SharedCache};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::models::{
    validate_key, DeleteResponse, GetResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, PagePreloadRequest, PagePreloadResponse, PredictionQuery,
    PredictionsResponse, RealtimeEventRequest, RealtimeEventResponse, SetRequest, SetResponse,
    StatsResponse, TierSyncResponse, UpdateRequest, UpdateResponse, UserEventResponse,
};
use crate::preload::{DataFetcher, PreloadReport, PreloadSettings, Preloader};
use crate::storage::LocalStorage;
use crate::sync::{
    PredictionTrigger, SyncManager, SyncSettings, SyncStatus, SyncTier, UserEvent,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub preloader: Preloader,
    pub sync: SyncManager,
}

impl AppState {
    pub fn new(cache: SharedCache, preloader: Preloader, sync: SyncManager) -> Self {
        Self {
            cache,
            preloader,
            sync,
        }
    }

    /// Wires the cache, preloader and sync manager from configuration.
    ///
    /// Background sync is not started here; see [`SyncManager::start`].
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn DataFetcher>,
        storage: LocalStorage,
    ) -> Self {
        let cache = cache::shared(CacheManager::from_config(config));
        let preloader = Preloader::new(
            cache.clone(),
            fetcher.clone(),
            PreloadSettings::from_config(config),
        );
        let sync = SyncManager::new(
            cache.clone(),
            fetcher,
            preloader.clone(),
            storage,
            SyncSettings::from_config(config),
        );
        Self::new(cache, preloader, sync)
    }
}

fn check_key(key: &str) -> Result<()> {
    match validate_key(key) {
        Some(error) => Err(SyncError::InvalidRequest(error)),
        None => Ok(()),
    }
}

// == Cache ==
/// Handler for PUT /cache
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(SyncError::InvalidRequest(error_msg));
    }

    let options = req.options();
    state
        .cache
        .write()
        .await
        .set(req.key.clone(), req.value, options);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
///
/// Needs the write lock: a hit updates access metadata and stats.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    check_key(&key)?;

    let mut cache = state.cache.write().await;
    let value = cache
        .get(&key)
        .ok_or_else(|| SyncError::NotFound(key.clone()))?;
    let entry = cache
        .entry(&key)
        .ok_or_else(|| SyncError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key.as_str(), value, entry)))
}

/// Handler for PATCH /cache
pub async fn update_handler(
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(SyncError::InvalidRequest(error_msg));
    }

    let options = req.options();
    let key = req.set.key;
    let invalidated = state
        .cache
        .write()
        .await
        .update(key.clone(), req.set.value, options);

    Ok(Json(UpdateResponse { key, invalidated }))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    check_key(&key)?;

    if !state.cache.write().await.delete(&key) {
        return Err(SyncError::NotFound(key));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(SyncError::InvalidRequest(error_msg));
    }

    let invalidated = state.cache.write().await.invalidate_by_tags(req.tags.as_slice());
    debug!("Invalidated {} entries for tags {:?}", invalidated, req.tags);

    Ok(Json(InvalidateResponse {
        tags: req.tags,
        invalidated,
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let (stats, max_entries) = {
        let cache = state.cache.read().await;
        (cache.stats(), cache.max_size())
    };
    let preload = state.preloader.stats().await;

    Json(StatsResponse::new(&stats, max_entries, preload))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Preload ==
/// Handler for POST /preload/user/:user_id
///
/// Returns once the immediate tier has landed; the rest keeps loading.
pub async fn preload_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PreloadReport>> {
    if user_id.trim().is_empty() {
        return Err(SyncError::InvalidRequest("User id cannot be empty".to_string()));
    }

    Ok(Json(state.preloader.preload_critical_data(&user_id).await))
}

/// Handler for POST /preload/page
pub async fn preload_page_handler(
    State(state): State<AppState>,
    Json(req): Json<PagePreloadRequest>,
) -> Json<PagePreloadResponse> {
    let queued = state.preloader.preload_page_data(&req.route).await;
    Json(PagePreloadResponse {
        route: req.route,
        queued,
    })
}

// == Sync ==
/// Handler for GET /sync/status
pub async fn sync_status_handler(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.sync.status().await)
}

/// Handler for POST /sync/:tier
pub async fn sync_tier_handler(
    State(state): State<AppState>,
    Path(tier): Path<String>,
) -> Result<Json<TierSyncResponse>> {
    let tier: SyncTier = tier.parse().map_err(SyncError::InvalidRequest)?;
    let report = state.sync.sync_tier(tier).await;

    Ok(Json(TierSyncResponse { tier, report }))
}

/// Handler for POST /events/user
pub async fn user_event_handler(
    State(state): State<AppState>,
    Json(event): Json<UserEvent>,
) -> Json<UserEventResponse> {
    let prefetched = state.sync.observe(event).await;
    Json(UserEventResponse { prefetched })
}

/// Handler for POST /events/realtime
pub async fn realtime_event_handler(
    State(state): State<AppState>,
    Json(req): Json<RealtimeEventRequest>,
) -> Json<RealtimeEventResponse> {
    let invalidated = state.sync.handle_realtime_event(req.event).await;
    Json(RealtimeEventResponse { invalidated })
}

/// Handler for GET /predictions
///
/// Reports predictions without prefetching anything.
pub async fn predictions_handler(
    State(state): State<AppState>,
    Query(query): Query<PredictionQuery>,
) -> Result<Json<PredictionsResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(SyncError::InvalidRequest(error_msg));
    }

    let trigger = PredictionTrigger {
        route: query.route.clone().or_else(|| state.sync.last_route()),
        hour: query.hour.unwrap_or_else(|| Local::now().hour()),
    };
    let predictions = state.sync.generate_predictions(&trigger).await;

    Ok(Json(PredictionsResponse {
        route: trigger.route,
        hour: trigger.hour,
        predictions,
    }))
}
