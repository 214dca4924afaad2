//! Queue Store with line-delimited JSON persistence
//!
//! The queue file holds one `QueueEntry` per line; file order is play order.
//! Every mutation reads the whole file, applies the change and writes the
//! whole file back. An internal mutex serializes those cycles within the
//! process; writers in other processes are not coordinated.
//!
//! Read policy:
//! - missing file: empty queue
//! - malformed line: skipped with a warning, remaining lines still returned
//! - other read failures: `list_all` degrades to an empty queue, mutating
//!   operations propagate `StorageIo` so a failed read never overwrites the file

use kq_common::{extract_media_id, Error, QueueEntry, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::metadata::{NoopTitleLookup, TitleLookup};

/// Durable ordered collection of queue entries
pub struct QueueStore {
    path: PathBuf,
    lookup: Arc<dyn TitleLookup>,
    lookup_timeout: Duration,
    write_lock: Mutex<()>,
}

impl QueueStore {
    /// Create a store backed by `path`, with title lookups disabled
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lookup: Arc::new(NoopTitleLookup),
            lookup_timeout: Duration::from_secs(5),
            write_lock: Mutex::new(()),
        }
    }

    /// Use `lookup` for titles, giving up after `timeout`
    pub fn with_title_lookup(mut self, lookup: Arc<dyn TitleLookup>, timeout: Duration) -> Self {
        self.lookup = lookup;
        self.lookup_timeout = timeout;
        self
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries in play order
    ///
    /// Never fails: read errors are logged and reported as an empty queue.
    pub async fn list_all(&self) -> Vec<QueueEntry> {
        match self.read_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read queue file {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    /// Head of the queue
    pub async fn peek_current(&self) -> Option<QueueEntry> {
        self.list_all().await.into_iter().next()
    }

    /// Number of entries
    pub async fn count(&self) -> usize {
        self.list_all().await.len()
    }

    /// Append a new entry at the tail
    ///
    /// Fails with `InvalidInput` when no media id can be extracted from
    /// `source_url` or `submitter_name` is blank. When `title` is `None` the
    /// title lookup runs first, outside the write lock, bounded by the lookup
    /// timeout; any lookup failure falls back to the media id.
    pub async fn append(
        &self,
        source_url: &str,
        submitter_name: &str,
        title: Option<String>,
    ) -> Result<QueueEntry> {
        let source_url = source_url.trim();
        let media_id = extract_media_id(source_url)
            .ok_or_else(|| Error::InvalidInput("Invalid YouTube URL".to_string()))?;

        let submitter_name = submitter_name.trim();
        if submitter_name.is_empty() {
            return Err(Error::InvalidInput("submitterName cannot be empty".to_string()));
        }

        let title = match title.filter(|t| !t.trim().is_empty()) {
            Some(title) => Some(title),
            None => self.resolve_title(source_url).await,
        };

        let entry = QueueEntry::new(source_url, media_id, title, submitter_name);

        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.push(entry.clone());
        self.write_entries(&entries).await?;

        info!(
            "Appended {} ({}) for {} at position {}",
            entry.media_id,
            entry.id,
            entry.submitter_name,
            entries.len()
        );
        Ok(entry)
    }

    /// Remove and return the head of the queue
    ///
    /// Returns `None` without touching the file when the queue is empty.
    pub async fn pop_current(&self) -> Result<Option<QueueEntry>> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;

        if entries.is_empty() {
            debug!("Pop requested on empty queue");
            return Ok(None);
        }

        let removed = entries.remove(0);
        self.write_entries(&entries).await?;

        info!("Popped {} ({}), {} remaining", removed.media_id, removed.id, entries.len());
        Ok(Some(removed))
    }

    /// Remove the entry with `id`, wherever it is
    ///
    /// Returns whether an entry was removed; the file is only rewritten when
    /// one was.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;

        let before = entries.len();
        entries.retain(|entry| entry.id != id);

        if entries.len() == before {
            debug!("Delete requested for absent entry {}", id);
            return Ok(false);
        }

        self.write_entries(&entries).await?;
        info!("Deleted entry {}, {} remaining", id, entries.len());
        Ok(true)
    }

    async fn resolve_title(&self, source_url: &str) -> Option<String> {
        match tokio::time::timeout(self.lookup_timeout, self.lookup.lookup_title(source_url)).await {
            Ok(Ok(title)) => Some(title),
            Ok(Err(e)) => {
                debug!("Title lookup for {} failed: {}", source_url, e);
                None
            }
            Err(_) => {
                debug!("Title lookup for {} timed out after {:?}", source_url, self.lookup_timeout);
                None
            }
        }
    }

    async fn read_entries(&self) -> Result<Vec<QueueEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::StorageIo(e)),
        };

        Ok(parse_lines(&content))
    }

    async fn write_entries(&self, entries: &[QueueEntry]) -> Result<()> {
        let mut content = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| Error::Internal(format!("Failed to serialize entry: {}", e)))?;
            content.push_str(&line);
            content.push('\n');
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("jsonl.tmp");
        let result: std::io::Result<()> = async {
            tokio::fs::write(&tmp_path, content).await?;
            tokio::fs::rename(&tmp_path, &self.path).await
        }
        .await;

        result.map_err(|e| {
            error!("Failed to write queue file {}: {}", self.path.display(), e);
            Error::StorageIo(e)
        })
    }
}

/// Parse queue file content, skipping blank and malformed lines
fn parse_lines(content: &str) -> Vec<QueueEntry> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str::<QueueEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping malformed queue record on line {}: {}", index + 1, e);
                None
            }
        })
        .collect()
}
