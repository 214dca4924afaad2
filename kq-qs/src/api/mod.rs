//! REST API for the Queue Store
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | POST | /queue | submit |
//! | GET | /queue/current | current snapshot |
//! | DELETE | /queue/current | advance (pop head) |
//! | DELETE | /queue/entry | delete by id |
//! | POST | /queue/auto | idle auto-fill |
//! | GET | /events | SSE queue events |

pub mod error;
pub mod handlers;
pub mod sse;

use axum::{
    routing::{delete, get, post},
    Router,
};
use kq_common::events::EventBus;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::catalog::FallbackCatalog;
use crate::store::QueueStore;

pub use error::ApiError;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<QueueStore>,
    pub catalog: Arc<FallbackCatalog>,
    /// Submitter identity for auto-filled entries
    pub auto_fill_submitter: String,
    pub events: Arc<EventBus>,
}

impl AppState {
    pub fn new(store: QueueStore, catalog: FallbackCatalog, auto_fill_submitter: impl Into<String>) -> Self {
        Self {
            store: Arc::new(store),
            catalog: Arc::new(catalog),
            auto_fill_submitter: auto_fill_submitter.into(),
            events: Arc::new(EventBus::new(100)),
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/build_info", get(handlers::build_info))

        // Queue operations
        .route("/queue", post(handlers::submit))
        .route("/queue/current", get(handlers::current).delete(handlers::advance))
        .route("/queue/entry", delete(handlers::delete_entry))
        .route("/queue/auto", post(handlers::auto_fill))

        // SSE event stream
        .route("/events", get(sse::event_stream))

        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Display and form may be served from another origin
        .layer(CorsLayer::permissive())
}
