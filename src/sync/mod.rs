//! Background Sync Module
//!
//! Tiered refresh of backend data, retry with backoff, realtime invalidation
//! and the predictive prefetch model.

mod backoff;
mod events;
mod manager;
mod model;
mod tier;

pub use backoff::{backoff_delay, FailureRecord, BACKOFF_BASE, BACKOFF_MAX};
pub use events::{RealtimeEvent, UserEvent};
pub use manager::{SyncManager, SyncReport, SyncSettings, SyncState, SyncStatus};
pub use model::{Prediction, PredictionKind, PredictionTrigger, PredictiveModel};
pub use tier::{SyncTarget, SyncTier};
