//! HTTP request handlers
//!
//! Every mutating handler publishes one `QueueEvent` after the store write
//! succeeds.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use kq_common::api::{
    AdvanceResponse, DeleteEntryRequest, EntryResponse, HealthResponse, MessageResponse,
    QueueSnapshot, SubmitRequest,
};
use kq_common::events::{EnqueueSource, QueueEvent};
use kq_common::Error;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{ApiError, AppState};

// ============================================================================
// Health / Build Info
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "kq-qs".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /build_info
pub async fn build_info() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": env!("GIT_HASH"),
        "build_timestamp": env!("BUILD_TIMESTAMP"),
        "build_profile": env!("BUILD_PROFILE"),
    }))
}

// ============================================================================
// Queue Endpoints
// ============================================================================

/// POST /queue - Submit a song request
///
/// 400 when a field is missing, not a string, blank, or the link has no
/// recognizable media id.
pub async fn submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        debug!("Rejected submit body: {}", rejection);
        ApiError::invalid_input("sourceUrl and submitterName must be strings")
    })?;

    let (Some(source_url), Some(submitter_name)) = (
        req.source_url.filter(|s| !s.is_empty()),
        req.submitter_name.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::invalid_input("sourceUrl and submitterName are required"));
    };

    info!("Submit request from {}: {}", submitter_name.trim(), source_url);

    let entry = state.store.append(&source_url, &submitter_name, None).await?;
    publish_added(&state, &entry, EnqueueSource::Manual).await;

    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            success: true,
            entry,
            message: None,
        }),
    ))
}

/// GET /queue/current - Current entry, remaining queue and counts
pub async fn current(State(state): State<AppState>) -> Json<QueueSnapshot> {
    let snapshot = QueueSnapshot::from_entries(state.store.list_all().await);
    debug!(
        "Snapshot: current={:?} length={}",
        snapshot.current.as_ref().map(|e| e.media_id.as_str()),
        snapshot.queue_length
    );
    Json(snapshot)
}

/// DELETE /queue/current - Consume the head of the queue
pub async fn advance(State(state): State<AppState>) -> Result<Json<AdvanceResponse>, ApiError> {
    let removed = state
        .store
        .pop_current()
        .await?
        .ok_or_else(|| ApiError::not_found("No video in queue to remove"))?;

    let remaining = state.store.list_all().await;
    state.events.publish(QueueEvent::CurrentAdvanced {
        removed_id: removed.id.clone(),
        current_id: remaining.first().map(|e| e.id.clone()),
        queue_length: remaining.len(),
        timestamp: Utc::now(),
    });

    Ok(Json(AdvanceResponse {
        success: true,
        removed,
    }))
}

/// DELETE /queue/entry - Remove an arbitrary entry by id
pub async fn delete_entry(
    State(state): State<AppState>,
    payload: Result<Json<DeleteEntryRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = payload
        .ok()
        .and_then(|Json(req)| req.id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_input("Entry ID is required"))?;

    if !state.store.delete_by_id(&id).await? {
        return Err(ApiError::not_found("Entry not found"));
    }

    state.events.publish(QueueEvent::EntryRemoved {
        entry_id: id,
        queue_length: state.store.count().await,
        timestamp: Utc::now(),
    });

    Ok(Json(MessageResponse {
        success: true,
        message: "Entry deleted successfully".to_string(),
    }))
}

/// POST /queue/auto - Append a random catalog entry
///
/// 500 when the catalog is empty.
pub async fn auto_fill(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let Some(source_url) = state.catalog.pick() else {
        warn!("Auto-fill requested but the fallback catalog is empty");
        return Err(Error::Internal("No videos found in catalog".to_string()).into());
    };

    let entry = state
        .store
        .append(source_url, &state.auto_fill_submitter, None)
        .await?;
    info!("Auto-filled {} ({})", entry.media_id, entry.title);
    publish_added(&state, &entry, EnqueueSource::Automatic).await;

    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            success: true,
            entry,
            message: Some("Random song auto-enqueued".to_string()),
        }),
    ))
}

async fn publish_added(state: &AppState, entry: &kq_common::QueueEntry, source: EnqueueSource) {
    state.events.publish(QueueEvent::EntryAdded {
        entry: entry.clone(),
        source,
        queue_length: state.store.count().await,
        timestamp: Utc::now(),
    });
}
