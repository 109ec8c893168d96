//! Preload Module
//!
//! Fetches backend data ahead of navigation and writes it into the cache.
//!
//! # Components
//! - `DataFetcher` / `HttpFetcher`: backend access
//! - `Preloader`: priority queue with bounded batch concurrency
//! - `catalog`: critical login set and per-route request tables

pub mod catalog;
mod fetcher;
mod preloader;
mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{DataFetcher, HttpFetcher};
pub use preloader::{PreloadReport, PreloadStats, PreloadedData, Preloader, QueueReport};
pub use request::{PreloadPriority, PreloadRequest, PreloadSettings, DEFAULT_PRELOAD_TTL};
