//! Queue data model
//!
//! One `QueueEntry` per line in the queue file. Entries are never mutated
//! after creation, only removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One submitted song request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredEntry")]
pub struct QueueEntry {
    /// Opaque unique token, assigned at creation
    pub id: String,
    /// Link as submitted
    pub source_url: String,
    /// Identifier extracted from `source_url`
    pub media_id: String,
    /// Display name; equals `media_id` when the lookup failed
    pub title: String,
    /// Who asked for the song (trimmed, non-empty)
    pub submitter_name: String,
    /// Creation timestamp
    pub submitted_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Build a new entry with a fresh id and the current time
    ///
    /// Callers validate `media_id` and `submitter_name` first.
    pub fn new(
        source_url: impl Into<String>,
        media_id: impl Into<String>,
        title: Option<String>,
        submitter_name: impl Into<String>,
    ) -> Self {
        let media_id = media_id.into();
        let title = title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| media_id.clone());

        Self {
            id: Uuid::new_v4().to_string(),
            source_url: source_url.into(),
            media_id,
            title,
            submitter_name: submitter_name.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// On-disk record shape
///
/// Accepts the field names written by earlier deployments
/// (`youtubeUrl`, `videoId`, `userName`, `addedAt`) and records without a title.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: String,
    #[serde(alias = "youtubeUrl")]
    source_url: String,
    #[serde(alias = "videoId")]
    media_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(alias = "userName")]
    submitter_name: String,
    #[serde(alias = "addedAt")]
    submitted_at: DateTime<Utc>,
}

impl From<StoredEntry> for QueueEntry {
    fn from(stored: StoredEntry) -> Self {
        let title = stored
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| stored.media_id.clone());

        Self {
            id: stored.id,
            source_url: stored.source_url,
            media_id: stored.media_id,
            title,
            submitter_name: stored.submitter_name,
            submitted_at: stored.submitted_at,
        }
    }
}
