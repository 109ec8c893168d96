//! Request and Response models for the agent API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{
    validate_key, InvalidateRequest, PagePreloadRequest, PredictionQuery, RealtimeEventRequest,
    SetRequest, UpdateRequest,
};
pub use responses::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateResponse, PagePreloadResponse,
    PredictionsResponse, RealtimeEventResponse, SetResponse, StatsResponse, TierSyncResponse,
    UpdateResponse, UserEventResponse,
};
