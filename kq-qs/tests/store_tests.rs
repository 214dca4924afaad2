//! Queue Store persistence and ordering tests
//!
//! Each test works on a queue file inside its own temporary directory.

use async_trait::async_trait;
use kq_common::{Error, QueueEntry, Result};
use kq_qs::metadata::TitleLookup;
use kq_qs::QueueStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Lookup returning a fixed title and counting calls
struct FixedTitle {
    title: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl TitleLookup for FixedTitle {
    async fn lookup_title(&self, _source_url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.title.to_string())
    }
}

/// Lookup that never answers
struct Hanging;

#[async_trait]
impl TitleLookup for Hanging {
    async fn lookup_title(&self, _source_url: &str) -> Result<String> {
        std::future::pending::<()>().await;
        Err(Error::MetadataLookup("unreachable".to_string()))
    }
}

fn temp_store() -> (TempDir, QueueStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = QueueStore::new(dir.path().join("queue.jsonl"));
    (dir, store)
}

async fn seed(store: &QueueStore, ids: &[&str]) -> Vec<QueueEntry> {
    let mut entries = Vec::new();
    for id in ids {
        let url = format!("https://www.youtube.com/watch?v={}", id);
        entries.push(store.append(&url, "Seeder", None).await.unwrap());
    }
    entries
}

fn media_ids(entries: &[QueueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.media_id.as_str()).collect()
}

#[tokio::test]
async fn test_missing_file_reads_as_empty() {
    let (_dir, store) = temp_store();

    assert!(store.list_all().await.is_empty());
    assert!(store.peek_current().await.is_none());
    assert_eq!(store.count().await, 0);
    assert!(!store.path().exists());
}

#[tokio::test]
async fn test_submit_scenario_alice() {
    let (_dir, store) = temp_store();

    store
        .append("https://www.youtube.com/watch?v=abc123", "Alice", None)
        .await
        .unwrap();

    let current = store.peek_current().await.expect("queue should have a head");
    assert_eq!(current.media_id, "abc123");
    assert_eq!(current.submitter_name, "Alice");
    assert_eq!(current.title, "abc123");
}

#[tokio::test]
async fn test_append_adds_one_entry_at_tail_with_unique_id() {
    let (_dir, store) = temp_store();
    let before = seed(&store, &["a1", "b2", "c3"]).await;

    let added = store.append("https://youtu.be/d4", "Dana", None).await.unwrap();
    let after = store.list_all().await;

    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after.last(), Some(&added));
    assert!(before.iter().all(|e| e.id != added.id));

    let ids: HashSet<&str> = after.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), after.len());
}

#[tokio::test]
async fn test_append_trims_submitter() {
    let (_dir, store) = temp_store();
    let entry = store.append("https://youtu.be/a1", "  Alice \n", None).await.unwrap();
    assert_eq!(entry.submitter_name, "Alice");
}

#[tokio::test]
async fn test_append_rejects_bad_link_and_blank_submitter() {
    let (_dir, store) = temp_store();

    let err = store.append("https://vimeo.com/123", "Alice", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = store.append("https://youtu.be/a1", "   ", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    assert_eq!(store.count().await, 0);
}

#[tokio::test]
async fn test_pop_returns_head_and_keeps_order() {
    let (_dir, store) = temp_store();
    let seeded = seed(&store, &["a1", "b2", "c3"]).await;

    let popped = store.pop_current().await.unwrap();
    assert_eq!(popped.as_ref(), Some(&seeded[0]));

    let remaining = store.list_all().await;
    assert_eq!(media_ids(&remaining), vec!["b2", "c3"]);
}

#[tokio::test]
async fn test_pop_two_entry_scenario() {
    let (_dir, store) = temp_store();
    let seeded = seed(&store, &["first", "second"]).await;

    let popped = store.pop_current().await.unwrap().unwrap();
    assert_eq!(popped.id, seeded[0].id);
    assert_eq!(store.count().await, 1);
    assert_eq!(store.peek_current().await.map(|e| e.id), Some(seeded[1].id.clone()));
}

#[tokio::test]
async fn test_pop_on_empty_is_noop() {
    let (_dir, store) = temp_store();

    assert!(store.pop_current().await.unwrap().is_none());
    assert!(store.list_all().await.is_empty());
}

#[tokio::test]
async fn test_delete_by_id_any_position() {
    let (_dir, store) = temp_store();
    let seeded = seed(&store, &["a1", "b2", "c3", "d4"]).await;

    assert!(store.delete_by_id(&seeded[2].id).await.unwrap());
    assert_eq!(media_ids(&store.list_all().await), vec!["a1", "b2", "d4"]);

    assert!(store.delete_by_id(&seeded[0].id).await.unwrap());
    assert_eq!(media_ids(&store.list_all().await), vec!["b2", "d4"]);

    assert!(store.delete_by_id(&seeded[3].id).await.unwrap());
    assert_eq!(media_ids(&store.list_all().await), vec!["b2"]);
}

#[tokio::test]
async fn test_delete_absent_id_changes_nothing() {
    let (_dir, store) = temp_store();
    seed(&store, &["a1", "b2"]).await;
    let before = std::fs::read_to_string(store.path()).unwrap();

    assert!(!store.delete_by_id("no-such-id").await.unwrap());

    let after = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_file_is_one_json_object_per_line() {
    let (_dir, store) = temp_store();
    seed(&store, &["a1", "b2"]).await;

    let content = std::fs::read_to_string(store.path()).unwrap();
    assert!(content.ends_with('\n'));

    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value["id"].is_string());
        assert!(value["sourceUrl"].is_string());
        assert!(value["mediaId"].is_string());
        assert!(value["title"].is_string());
        assert!(value["submitterName"].is_string());
        assert!(value["submittedAt"].is_string());
    }
}

#[tokio::test]
async fn test_emptied_queue_writes_empty_file() {
    let (_dir, store) = temp_store();
    seed(&store, &["a1"]).await;
    store.pop_current().await.unwrap();

    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "");
}

#[tokio::test]
async fn test_malformed_lines_are_skipped_and_dropped_on_next_write() {
    let (_dir, store) = temp_store();
    let seeded = seed(&store, &["a1", "b2"]).await;

    let mut content = std::fs::read_to_string(store.path()).unwrap();
    content.insert_str(0, "{\"garbage\": true}\nnot json at all\n");
    std::fs::write(store.path(), content).unwrap();

    let listed = store.list_all().await;
    assert_eq!(media_ids(&listed), vec!["a1", "b2"]);
    assert_eq!(store.peek_current().await.map(|e| e.id), Some(seeded[0].id.clone()));

    store.pop_current().await.unwrap();
    let rewritten = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(rewritten.lines().count(), 1);
}

#[tokio::test]
async fn test_reads_legacy_records() {
    let (_dir, store) = temp_store();
    std::fs::write(
        store.path(),
        concat!(
            r#"{"id":"old-1","youtubeUrl":"https://youtu.be/xyz","videoId":"xyz","title":"Old Song","userName":"Bob","addedAt":"2025-12-24T20:00:00.000Z"}"#,
            "\n",
            r#"{"id":"old-2","youtubeUrl":"https://youtu.be/qrs","videoId":"qrs","userName":"Cy","addedAt":"2025-12-24T20:01:00.000Z"}"#,
            "\n",
        ),
    )
    .unwrap();

    let listed = store.list_all().await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].title, "Old Song");
    assert_eq!(listed[1].title, "qrs");

    assert!(store.delete_by_id("old-2").await.unwrap());
    let rewritten = std::fs::read_to_string(store.path()).unwrap();
    assert!(rewritten.contains("\"sourceUrl\""));
    assert!(!rewritten.contains("\"youtubeUrl\""));
}

#[tokio::test]
async fn test_title_lookup_used_when_title_not_supplied() {
    let dir = tempfile::tempdir().unwrap();
    let lookup = Arc::new(FixedTitle {
        title: "Last Christmas",
        calls: AtomicUsize::new(0),
    });
    let store = QueueStore::new(dir.path().join("queue.jsonl"))
        .with_title_lookup(lookup.clone(), Duration::from_secs(1));

    let looked_up = store.append("https://youtu.be/a1", "Alice", None).await.unwrap();
    assert_eq!(looked_up.title, "Last Christmas");

    let supplied = store
        .append("https://youtu.be/b2", "Bob", Some("Given".to_string()))
        .await
        .unwrap();
    assert_eq!(supplied.title, "Given");

    assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hanging_lookup_falls_back_to_media_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = QueueStore::new(dir.path().join("queue.jsonl"))
        .with_title_lookup(Arc::new(Hanging), Duration::from_millis(50));

    let started = Instant::now();
    let entry = store.append("https://youtu.be/a1", "Alice", None).await.unwrap();

    assert_eq!(entry.title, "a1");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(store.count().await, 1);
}

#[tokio::test]
async fn test_concurrent_appends_are_not_lost() {
    let (_dir, store) = temp_store();
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let url = format!("https://youtu.be/id{}", i);
            store.append(&url, "Crowd", None).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.count().await, 16);
}

#[tokio::test]
async fn test_write_failure_propagates_as_storage_io() {
    let dir = tempfile::tempdir().unwrap();
    // Queue path is a directory: reads and writes both fail
    let store = QueueStore::new(dir.path().to_path_buf());

    assert!(store.list_all().await.is_empty());

    let err = store.append("https://youtu.be/a1", "Alice", None).await.unwrap_err();
    assert!(matches!(err, Error::StorageIo(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_write_to_read_only_directory_is_storage_io() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = QueueStore::new(dir.path().join("queue.jsonl"));
    let seeded = store.append("https://youtu.be/a1", "Alice", None).await.unwrap();
    let before = std::fs::read_to_string(store.path()).unwrap();

    std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
    // Permission bits do not bind root; nothing to check in that case
    let canary = dir.path().join("canary");
    if std::fs::write(&canary, b"").is_ok() {
        let _ = std::fs::remove_file(&canary);
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    // The file itself still reads fine; only the temp-file write fails
    assert_eq!(store.list_all().await, vec![seeded.clone()]);

    let err = store.append("https://youtu.be/b2", "Bob", None).await.unwrap_err();
    assert!(matches!(err, Error::StorageIo(_)));
    let err = store.pop_current().await.unwrap_err();
    assert!(matches!(err, Error::StorageIo(_)));
    let err = store.delete_by_id(&seeded.id).await.unwrap_err();
    assert!(matches!(err, Error::StorageIo(_)));

    std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    assert!(!dir.path().join("queue.jsonl.tmp").exists());
}
