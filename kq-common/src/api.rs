//! Shared API request/response types
//!
//! Used by the Queue Store service (kq-qs) to shape its responses and by the
//! Playback Controller (kq-pc) to decode them.

use serde::{Deserialize, Serialize};

use crate::model::QueueEntry;

// ========================================
// Requests
// ========================================

/// POST /queue body
///
/// Both fields are optional at the type level so that a missing field is a
/// 400 with a useful message rather than a deserializer rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default, alias = "youtubeUrl")]
    pub source_url: Option<String>,
    #[serde(default, alias = "userName")]
    pub submitter_name: Option<String>,
}

/// DELETE /queue/entry body
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DeleteEntryRequest {
    #[serde(default)]
    pub id: Option<String>,
}

// ========================================
// Responses
// ========================================

/// 201 response for POST /queue and POST /queue/auto
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryResponse {
    pub success: bool,
    pub entry: QueueEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /queue/current response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Head of the queue, if any
    pub current: Option<QueueEntry>,
    /// Entries after the head, in play order
    #[serde(default)]
    pub queue: Vec<QueueEntry>,
    /// Total entries including the head
    pub queue_length: usize,
    /// Entries waiting behind the head
    pub up_next: usize,
}

impl QueueSnapshot {
    /// Build a snapshot from a full ordered listing
    pub fn from_entries(mut entries: Vec<QueueEntry>) -> Self {
        let queue_length = entries.len();
        let current = if entries.is_empty() {
            None
        } else {
            Some(entries.remove(0))
        };

        Self {
            current,
            queue: entries,
            queue_length,
            up_next: queue_length.saturating_sub(1),
        }
    }
}

/// DELETE /queue/current response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdvanceResponse {
    pub success: bool,
    pub removed: QueueEntry,
}

/// Generic success response with a message
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /health response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}
