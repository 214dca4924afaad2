//! # Karaoke Queue Store (kq-qs)
//!
//! Durable ordered queue of song requests behind a small HTTP API.
//!
//! **Purpose:** Accept submissions, persist them to a line-delimited JSON
//! file, and serve the snapshot the display polls. Pop, delete and idle
//! auto-fill requests come back from the display.

pub mod api;
pub mod catalog;
pub mod metadata;
pub mod store;

pub use api::{create_router, AppState};
pub use catalog::FallbackCatalog;
pub use store::QueueStore;
