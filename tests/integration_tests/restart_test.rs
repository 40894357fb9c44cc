//! Restart durability
//!
//! A "restart" here drops every in-memory object and rebuilds the
//! orchestrator from the persisted store alone.

use tempfile::TempDir;

use rollcall::storage::{DurableQueue, FileStore, KeyValueStore, MemoryStore, SqliteStore, StorageError};
use rollcall::sync::{SyncOutcome, SyncTrigger};

use super::fixtures::{CORRUPT_QUEUE_BLOB, LEGACY_QUEUE_BLOB};
use crate::common::{orchestrator, tags, MockSink, QUEUE_KEY};

#[tokio::test]
async fn test_sqlite_queue_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("rollcall.db");

    let captured = {
        let orch = orchestrator(
            SqliteStore::open(&db_path).unwrap(),
            MockSink::rejecting(),
            true,
        );
        let outcome = orch.record_scan("04A1B2C3").await.unwrap();
        assert!(outcome.is_queued());
        outcome.record().clone()
    };

    let sink = MockSink::accepting();
    let orch = orchestrator(SqliteStore::open(&db_path).unwrap(), sink.clone(), true);
    assert_eq!(orch.pending().await, 1);
    assert_eq!(orch.queued_records().await, vec![captured.clone()]);

    assert_eq!(
        orch.sync_now(SyncTrigger::Manual).await,
        SyncOutcome::Synced {
            delivered: 1,
            pending: 0
        }
    );
    assert_eq!(sink.accepted_records(), vec![captured]);
    drop(orch);

    let store = SqliteStore::open(&db_path).unwrap();
    assert!(store.get(QUEUE_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_file_queue_survives_restart() {
    let temp_dir = TempDir::new().unwrap();

    {
        let orch = orchestrator(
            FileStore::new(temp_dir.path()).unwrap(),
            MockSink::accepting(),
            false,
        );
        for tag in ["A", "B", "C"] {
            orch.record_scan(tag).await.unwrap();
        }
    }

    let orch = orchestrator(
        FileStore::new(temp_dir.path()).unwrap(),
        MockSink::accepting(),
        false,
    );
    assert_eq!(tags(&orch.queued_records().await), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_legacy_records_keep_ids_across_restarts() {
    let store = MemoryStore::new();
    store.set(QUEUE_KEY, LEGACY_QUEUE_BLOB).unwrap();

    let first = DurableQueue::open(store.clone(), QUEUE_KEY).unwrap().drain_all();
    let second = DurableQueue::open(store.clone(), QUEUE_KEY).unwrap().drain_all();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(tags(&first), vec!["04A1B2C3", "QR-STUDENT-17"]);
    assert_eq!(first[0].timestamp_iso(), "2024-03-01T08:59:12.345Z");

    let sink = MockSink::accepting();
    let orch = orchestrator(store, sink.clone(), true);
    orch.sync_now(SyncTrigger::Manual).await;
    assert_eq!(sink.accepted_records(), first);
}

#[test]
fn test_corrupt_blob_is_reported_not_discarded() {
    let store = MemoryStore::new();
    store.set(QUEUE_KEY, CORRUPT_QUEUE_BLOB).unwrap();

    let result = DurableQueue::open(store.clone(), QUEUE_KEY);
    assert!(matches!(result, Err(StorageError::Serialization { .. })));

    // The blob is left in place for manual recovery
    assert_eq!(
        store.get(QUEUE_KEY).unwrap().as_deref(),
        Some(CORRUPT_QUEUE_BLOB)
    );
}
