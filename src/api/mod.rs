//! API Module
//!
//! HTTP handlers and routing for the local agent API.
//!
//! # Endpoints
//! - `GET /health`, `GET /stats`
//! - `PUT /cache`, `PATCH /cache`, `GET /cache/:key`, `DELETE /cache/:key`
//! - `POST /cache/invalidate`
//! - `POST /preload/user/:user_id`, `POST /preload/page`
//! - `GET /sync/status`, `POST /sync/:tier`
//! - `POST /events/user`, `POST /events/realtime`
//! - `GET /predictions`

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
