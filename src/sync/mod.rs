//! Sync orchestrator
//!
//! Decides, for every captured record, whether to deliver it directly or
//! queue it, and drains the offline queue when connectivity returns.
//!
//! # State machine
//!
//! ```text
//!            capture, online, not syncing           drain trigger, queue non-empty
//!   Idle ─────────────────────────────▶ Submitting     Idle ─────────────────▶ Syncing
//!     ▲   ok: Delivered / err: SavedOffline  │           ▲   ok: SyncComplete      │
//!     └──────────────────────────────────────┘           └── err: SyncFailed ──────┘
//! ```
//!
//! - Records captured offline, or while a drain is in flight, go straight to
//!   the queue as their own append; they are never merged into an in-flight
//!   batch.
//! - A drain trigger that arrives while a drain is running is coalesced.
//! - After a successful drain only the submitted prefix is removed, so
//!   records appended during the drain stay queued for the next one.
//! - Failures never drop a record: a rejected submit degrades to "queued".
//!   The only loss path is a storage failure right after a rejected submit,
//!   which is logged at error level and reported as [`ScanOutcome::Lost`].
//! - Queue writes run on the blocking pool; the async workers never wait on
//!   an fsync.

pub mod events;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch};
use tokio::time::{Interval, MissedTickBehavior};

pub use events::{ScanOutcome, SyncEvent, SyncOutcome, SyncTrigger};

use crate::capture::{capture, CaptureError};
use crate::config::Config;
use crate::connectivity::ConnectivityMonitor;
use crate::metrics;
use crate::models::{AttendanceRecord, StatusReport, SyncStatus};
use crate::sink::{RemoteSink, RestSink};
use crate::storage::{open_store, DurableQueue, KeyValueStore, StorageError, StorageResult};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Coordinates capture, direct delivery, queueing and draining
pub struct SyncOrchestrator<S> {
    /// Offline queue; never locked across a submit
    queue: Arc<Mutex<DurableQueue<S>>>,

    sink: Arc<dyn RemoteSink>,

    monitor: ConnectivityMonitor,

    /// Reentrancy guard for drains
    syncing: AtomicBool,

    status: watch::Sender<StatusReport>,

    events: broadcast::Sender<SyncEvent>,
}

/// Clears the drain flag when dropped
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl<S: KeyValueStore + 'static> SyncOrchestrator<S> {
    /// Create an orchestrator owning `queue`
    pub fn new(
        queue: DurableQueue<S>,
        sink: Arc<dyn RemoteSink>,
        monitor: ConnectivityMonitor,
    ) -> Self {
        let pending = queue.count();
        metrics::set_pending(pending);

        let (status, _) = watch::channel(StatusReport {
            status: SyncStatus::Idle,
            pending,
            online: monitor.is_online(),
        });
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            queue: Arc::new(Mutex::new(queue)),
            sink,
            monitor,
            syncing: AtomicBool::new(false),
            status,
            events,
        }
    }

    /// Capture `raw` and deliver or queue the resulting record
    ///
    /// Only an empty scan is reported as an error; every delivery problem is
    /// absorbed into the returned [`ScanOutcome`].
    pub async fn record_scan(&self, raw: &str) -> Result<ScanOutcome, CaptureError> {
        let record = capture(raw)?;
        metrics::record_captured();
        Ok(self.submit(record).await)
    }

    /// Deliver an already captured record, falling back to the queue
    pub async fn submit(&self, record: AttendanceRecord) -> ScanOutcome {
        if !self.monitor.is_online() {
            tracing::debug!(tag = %record.tag(), "Offline, queuing record");
            return self.enqueue(record).await;
        }

        if self.is_syncing() {
            tracing::debug!(tag = %record.tag(), "Drain in flight, queuing record");
            return self.enqueue(record).await;
        }

        self.set_status(SyncStatus::Submitting);
        match self.sink.submit_batch(std::slice::from_ref(&record)).await {
            Ok(()) => {
                metrics::record_direct_delivery();
                self.set_status(SyncStatus::Delivered);
                self.emit(SyncEvent::Delivered {
                    tag: record.tag().to_string(),
                });
                tracing::info!(tag = %record.tag(), sink = self.sink.name(), "Record delivered");
                ScanOutcome::Delivered(record)
            }
            Err(e) => {
                tracing::warn!(
                    tag = %record.tag(),
                    error = %e,
                    "Direct delivery failed, queuing record"
                );
                self.enqueue(record).await
            }
        }
    }

    async fn enqueue(&self, record: AttendanceRecord) -> ScanOutcome {
        let appended = record.clone();
        let result = self
            .with_queue(move |queue| {
                queue.append(appended)?;
                Ok(queue.count())
            })
            .await;

        match result {
            Ok(pending) => {
                metrics::record_queued(pending);
                self.publish(SyncStatus::SavedOffline, pending);
                self.emit(SyncEvent::Queued {
                    tag: record.tag().to_string(),
                    pending,
                });
                tracing::info!(tag = %record.tag(), pending, "Record saved offline");
                ScanOutcome::Queued { record, pending }
            }
            Err(error) => {
                metrics::record_storage_failure();
                tracing::error!(
                    tag = %record.tag(),
                    timestamp = %record.timestamp_iso(),
                    error = %error,
                    "RECORD LOST: could not persist record to offline queue"
                );
                self.emit(SyncEvent::StorageFailed {
                    error: error.to_string(),
                });
                ScanOutcome::Lost { record, error }
            }
        }
    }

    /// Drain the queue now
    ///
    /// Returns [`SyncOutcome::AlreadySyncing`] without touching the sink when
    /// another drain is in flight.
    pub async fn sync_now(&self, trigger: SyncTrigger) -> SyncOutcome {
        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            metrics::record_drain_coalesced();
            self.emit(SyncEvent::DrainCoalesced { trigger });
            tracing::debug!(%trigger, "Drain already in flight, trigger coalesced");
            return SyncOutcome::AlreadySyncing;
        };

        let batch = self.lock_queue().drain_all();
        if batch.is_empty() {
            tracing::debug!(%trigger, "Nothing to sync");
            return SyncOutcome::NothingToSync;
        }

        let batch_size = batch.len();
        self.set_status(SyncStatus::Syncing);
        self.emit(SyncEvent::DrainStarted {
            trigger,
            batch_size,
        });
        tracing::info!(%trigger, batch_size, "Draining offline queue");

        let started = Instant::now();
        let result = self.sink.submit_batch(&batch).await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                let acknowledged = self
                    .with_queue(move |queue| queue.acknowledge(batch_size))
                    .await;
                let pending = self.lock_queue().count();

                if let Err(e) = acknowledged {
                    metrics::record_storage_failure();
                    tracing::error!(
                        error = %e,
                        batch_size,
                        "Batch delivered but queue could not be cleared; it will be resubmitted"
                    );
                    self.emit(SyncEvent::StorageFailed {
                        error: e.to_string(),
                    });
                }

                metrics::record_drain(batch_size, true, elapsed.as_secs_f64(), pending);
                self.publish(SyncStatus::SyncComplete, pending);
                self.emit(SyncEvent::DrainCompleted {
                    delivered: batch_size,
                    pending,
                });
                tracing::info!(
                    delivered = batch_size,
                    pending,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Sync complete"
                );
                SyncOutcome::Synced {
                    delivered: batch_size,
                    pending,
                }
            }
            Err(error) => {
                let pending = self.lock_queue().count();

                metrics::record_drain(batch_size, false, elapsed.as_secs_f64(), pending);
                self.publish(SyncStatus::SyncFailed, pending);
                self.emit(SyncEvent::DrainFailed {
                    error: error.to_string(),
                    pending,
                });
                tracing::warn!(error = %error, pending, "Sync failed, will retry on next trigger");
                SyncOutcome::Failed { error, pending }
            }
        }
    }

    /// React to connectivity transitions until `shutdown` flips to `true`
    ///
    /// Each `offline → online` transition spawns a drain, including a reconnect
    /// that was already followed by another flip by the time the loop woke.
    /// Overlapping drains are coalesced by the guard. With `retry_interval` set, a drain is also
    /// attempted on every tick while online and the queue is non-empty.
    pub async fn run(
        self: Arc<Self>,
        retry_interval: Option<Duration>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut online_rx = self.monitor.subscribe();
        let initial = *online_rx.borrow_and_update();
        let mut reconnects = initial.reconnects;
        let mut ticker = retry_interval.map(|period| {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        tracing::debug!(online = initial.online, ?retry_interval, "Sync loop started");

        loop {
            tokio::select! {
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *online_rx.borrow_and_update();
                    self.status.send_modify(|report| report.online = state.online);

                    if state.reconnects > reconnects {
                        reconnects = state.reconnects;
                        if state.online {
                            self.spawn_drain(SyncTrigger::Reconnected);
                        } else {
                            tracing::debug!("Reconnect already lost again, skipping drain");
                        }
                    }
                }
                _ = next_tick(&mut ticker) => {
                    if self.monitor.is_online() && self.pending().await > 0 {
                        self.spawn_drain(SyncTrigger::Periodic);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Sync loop stopped");
    }

    fn spawn_drain(self: &Arc<Self>, trigger: SyncTrigger) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.sync_now(trigger).await;
        });
    }

    /// Number of records waiting in the queue
    pub async fn pending(&self) -> usize {
        self.lock_queue().count()
    }

    /// Snapshot of the queue, oldest first
    pub async fn queued_records(&self) -> Vec<AttendanceRecord> {
        self.lock_queue().drain_all()
    }

    /// Lock the in-memory queue, ignoring poison
    fn lock_queue(&self) -> MutexGuard<'_, DurableQueue<S>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a queue mutation on the blocking pool
    async fn with_queue<T, F>(&self, op: F) -> StorageResult<T>
    where
        F: FnOnce(&mut DurableQueue<S>) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let queue = Arc::clone(&self.queue);
        tokio::task::spawn_blocking(move || {
            let mut queue = queue.lock().unwrap_or_else(PoisonError::into_inner);
            op(&mut queue)
        })
        .await
        .map_err(|e| StorageError::Unavailable(format!("queue task failed: {e}")))?
    }

    /// Whether a drain is in flight
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Current status snapshot
    pub fn status(&self) -> StatusReport {
        *self.status.borrow()
    }

    /// Receiver for status changes
    pub fn subscribe_status(&self) -> watch::Receiver<StatusReport> {
        self.status.subscribe()
    }

    /// Receiver for sync events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_modify(|report| report.status = status);
    }

    fn publish(&self, status: SyncStatus, pending: usize) {
        let online = self.monitor.is_online();
        self.status.send_modify(|report| {
            report.status = status;
            report.pending = pending;
            report.online = online;
        });
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl SyncOrchestrator<Box<dyn KeyValueStore>> {
    /// Wire the configured store, queue and REST sink
    pub fn from_config(config: &Config, monitor: ConnectivityMonitor) -> crate::error::Result<Self> {
        let store = open_store(&config.storage)?;
        let queue = DurableQueue::open(store, config.storage.queue_key.clone())?;
        let sink = RestSink::new(&config.sink)?;
        Ok(Self::new(queue, Arc::new(sink), monitor))
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
