//! Offline capture and reconnect scenarios
//!
//! Drives the orchestrator through connectivity transitions with an
//! in-process sink and checks what ends up queued and delivered.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use rollcall::models::SyncStatus;
use rollcall::storage::MemoryStore;
use rollcall::sync::{ScanOutcome, SyncEvent, SyncOutcome, SyncTrigger};

use crate::common::{orchestrator, tags, until_syncing, MockSink};

/// Wait for the next `DrainCompleted` or `DrainFailed` event
async fn next_drain_result(
    events: &mut tokio::sync::broadcast::Receiver<SyncEvent>,
) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await.unwrap() {
                event @ (SyncEvent::DrainCompleted { .. } | SyncEvent::DrainFailed { .. }) => {
                    return event
                }
                _ => continue,
            }
        }
    })
    .await
    .expect("drain did not finish")
}

#[tokio::test]
async fn test_offline_reconnect_reject_manual_sync() {
    let sink = MockSink::accepting();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), false);
    let mut events = orch.subscribe_events();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&orch).run(None, shutdown_rx));
    tokio::task::yield_now().await;

    // Offline: queued without touching the sink
    let r1 = orch.record_scan("04A1B2C3").await.unwrap();
    assert!(r1.is_queued());
    assert_eq!(orch.queued_records().await, vec![r1.record().clone()]);
    assert_eq!(sink.calls(), 0);

    // Back online: drained automatically
    orch.monitor().set_online(true);
    assert_eq!(
        next_drain_result(&mut events).await,
        SyncEvent::DrainCompleted {
            delivered: 1,
            pending: 0
        }
    );
    assert_eq!(orch.pending().await, 0);
    assert_eq!(sink.accepted_records(), vec![r1.record().clone()]);

    // Online but the sink rejects: queued
    sink.set_rejecting(true);
    let r2 = orch.record_scan("04D5E6F7").await.unwrap();
    assert!(r2.is_queued());
    assert_eq!(orch.queued_records().await, vec![r2.record().clone()]);

    // Manual sync once the sink recovers
    sink.set_rejecting(false);
    assert_eq!(
        orch.sync_now(SyncTrigger::Manual).await,
        SyncOutcome::Synced {
            delivered: 1,
            pending: 0
        }
    );
    assert_eq!(orch.pending().await, 0);
    assert_eq!(orch.status().status, SyncStatus::SyncComplete);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_double_reconnect_submits_once() {
    let (sink, gate) = MockSink::gated();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), false);
    for tag in ["A", "B", "C"] {
        orch.record_scan(tag).await.unwrap();
    }

    let (first, second) = futures::future::join(
        orch.sync_now(SyncTrigger::Reconnected),
        async {
            until_syncing(&orch).await;
            let second = orch.sync_now(SyncTrigger::Reconnected).await;
            gate.add_permits(1);
            second
        },
    )
    .await;

    assert_eq!(
        first,
        SyncOutcome::Synced {
            delivered: 3,
            pending: 0
        }
    );
    assert_eq!(second, SyncOutcome::AlreadySyncing);
    assert_eq!(sink.calls(), 1);
    assert_eq!(tags(&sink.accepted()[0]), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_flapping_connectivity_never_duplicates() {
    let (sink, gate) = MockSink::gated();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), false);
    orch.record_scan("A").await.unwrap();
    orch.record_scan("B").await.unwrap();

    let mut events = orch.subscribe_events();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&orch).run(None, shutdown_rx));
    tokio::task::yield_now().await;

    orch.monitor().set_online(true);
    until_syncing(&orch).await;

    // Several reconnects while the first drain is still in flight
    for _ in 0..3 {
        orch.monitor().set_online(false);
        tokio::time::sleep(Duration::from_millis(5)).await;
        orch.monitor().set_online(true);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    gate.add_permits(10);
    assert_eq!(
        next_drain_result(&mut events).await,
        SyncEvent::DrainCompleted {
            delivered: 2,
            pending: 0
        }
    );

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.accepted_records().len(), 2);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_scans_during_drain_wait_for_next_drain() {
    let (sink, gate) = MockSink::gated();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), false);
    orch.record_scan("A").await.unwrap();
    orch.monitor().set_online(true);

    let drain = tokio::spawn({
        let orch = Arc::clone(&orch);
        async move { orch.sync_now(SyncTrigger::Manual).await }
    });
    until_syncing(&orch).await;

    let late = orch.record_scan("B").await.unwrap();
    assert!(matches!(late, ScanOutcome::Queued { pending: 2, .. }));

    gate.add_permits(1);
    assert_eq!(
        drain.await.unwrap(),
        SyncOutcome::Synced {
            delivered: 1,
            pending: 1
        }
    );
    assert_eq!(tags(&orch.queued_records().await), vec!["B"]);

    gate.add_permits(1);
    assert_eq!(
        orch.sync_now(SyncTrigger::Manual).await,
        SyncOutcome::Synced {
            delivered: 1,
            pending: 0
        }
    );
    assert_eq!(tags(&sink.accepted_records()), vec!["A", "B"]);
}

#[tokio::test]
async fn test_failed_drain_retried_periodically() {
    let sink = MockSink::rejecting();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), true);
    orch.record_scan("A").await.unwrap();
    assert_eq!(orch.pending().await, 1);

    let mut events = orch.subscribe_events();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(
        Arc::clone(&orch).run(Some(Duration::from_millis(20)), shutdown_rx),
    );

    assert!(matches!(
        next_drain_result(&mut events).await,
        SyncEvent::DrainFailed { pending: 1, .. }
    ));

    sink.set_rejecting(false);
    loop {
        if let SyncEvent::DrainCompleted { .. } = next_drain_result(&mut events).await {
            break;
        }
    }
    assert_eq!(orch.pending().await, 0);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_status_updates_follow_outcomes() {
    let sink = MockSink::accepting();
    let orch = orchestrator(MemoryStore::new(), sink.clone(), true);
    let mut status = orch.subscribe_status();

    orch.record_scan("A").await.unwrap();
    status.changed().await.unwrap();
    assert_eq!(status.borrow_and_update().status, SyncStatus::Delivered);

    orch.monitor().set_online(false);
    orch.record_scan("B").await.unwrap();
    let report = *status.borrow_and_update();
    assert_eq!(report.status, SyncStatus::SavedOffline);
    assert_eq!(report.pending, 1);
    assert!(!report.online);
}
