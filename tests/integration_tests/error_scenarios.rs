//! Error scenario integration tests
//!
//! Tests failure modes on the local side:
//! 1. Empty scans
//! 2. Queue writes failing after a rejected submit
//! 3. Queue cleanup failing after an accepted drain
//! 4. Sink rejecting a drain

use rollcall::error::{Error, ErrorCategory, RollcallErrorTrait};
use rollcall::models::SyncStatus;
use rollcall::storage::MemoryStore;
use rollcall::sync::{ScanOutcome, SyncEvent, SyncOutcome, SyncTrigger};
use rollcall::capture::CaptureError;

use crate::common::{orchestrator, FlakyStore, MockSink};

// ============================================================================
// Capture Errors
// ============================================================================

#[tokio::test]
async fn test_blank_scans_rejected_without_side_effects() {
    let sink = MockSink::accepting();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), true);

    for raw in ["", "   ", "\t\n"] {
        let err = orch.record_scan(raw).await.unwrap_err();
        assert_eq!(err, CaptureError::EmptyInput);
    }
    assert_eq!(sink.calls(), 0);
    assert_eq!(orch.pending().await, 0);

    let err: Error = CaptureError::EmptyInput.into();
    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!(!err.is_recoverable());
}

// ============================================================================
// Storage Errors
// ============================================================================

#[tokio::test]
async fn test_storage_failure_after_rejection_reports_lost_record() {
    let store = FlakyStore::default();
    let orch = orchestrator(store.clone(), MockSink::rejecting(), true);
    let mut events = orch.subscribe_events();

    store.set_failing(true);
    let outcome = orch.record_scan("04A1B2C3").await.unwrap();

    match &outcome {
        ScanOutcome::Lost { record, error } => {
            assert_eq!(record.tag(), "04A1B2C3");
            assert!(error.to_string().contains("disk full"));
            assert_eq!(error.category(), ErrorCategory::Storage);
        }
        other => panic!("expected Lost, got {other:?}"),
    }
    assert_eq!(orch.pending().await, 0);

    let mut saw_storage_failure = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SyncEvent::StorageFailed { .. }) {
            saw_storage_failure = true;
        }
    }
    assert!(saw_storage_failure);

    // Storage back: the next capture queues normally
    store.set_failing(false);
    assert!(orch.record_scan("04D5E6F7").await.unwrap().is_queued());
    assert_eq!(orch.pending().await, 1);
}

#[tokio::test]
async fn test_cleanup_failure_resubmits_same_records() {
    let store = FlakyStore::default();
    let sink = MockSink::accepting();
    let orch = orchestrator(store.clone(), sink.clone(), false);
    let queued = orch.record_scan("A").await.unwrap().record().clone();

    store.set_failing(true);
    let outcome = orch.sync_now(SyncTrigger::Manual).await;
    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            delivered: 1,
            pending: 1
        }
    );

    store.set_failing(false);
    orch.sync_now(SyncTrigger::Manual).await;
    assert_eq!(orch.pending().await, 0);

    // Same idempotency key both times, so the remote can drop the repeat
    let accepted = sink.accepted_records();
    assert_eq!(accepted.len(), 2);
    assert_eq!(accepted[0].id(), queued.id());
    assert_eq!(accepted[1].id(), queued.id());
}

// ============================================================================
// Remote Errors
// ============================================================================

#[tokio::test]
async fn test_rejected_drain_keeps_everything_queued() {
    let sink = MockSink::rejecting();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), false);
    for tag in ["A", "B"] {
        orch.record_scan(tag).await.unwrap();
    }
    let before = orch.queued_records().await;

    match orch.sync_now(SyncTrigger::Manual).await {
        SyncOutcome::Failed { error, pending } => {
            assert_eq!(pending, 2);
            assert!(error.is_transient());
            let err: Error = error.into();
            assert_eq!(err.category(), ErrorCategory::Network);
            assert!(err.is_recoverable());
        }
        other => panic!("expected Failed, got {other:?}"),
    }

    assert_eq!(orch.queued_records().await, before);
    assert_eq!(orch.status().status, SyncStatus::SyncFailed);
}
