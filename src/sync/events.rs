//! Outcomes and events emitted by the sync orchestrator

use crate::models::AttendanceRecord;
use crate::sink::RemoteError;
use crate::storage::StorageError;

/// What caused a drain attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Connectivity went from offline to online
    Reconnected,
    /// Operator asked for a sync
    Manual,
    /// Periodic retry tick while online
    Periodic,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconnected => write!(f, "reconnected"),
            Self::Manual => write!(f, "manual"),
            Self::Periodic => write!(f, "periodic"),
        }
    }
}

/// Result of handing one scan to the orchestrator
#[derive(Debug)]
pub enum ScanOutcome {
    /// Sink accepted the record directly
    Delivered(AttendanceRecord),

    /// Record persisted in the offline queue
    Queued {
        record: AttendanceRecord,
        pending: usize,
    },

    /// Sink unavailable and the queue could not be written
    Lost {
        record: AttendanceRecord,
        error: StorageError,
    },
}

impl ScanOutcome {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            Self::Delivered(record) | Self::Queued { record, .. } | Self::Lost { record, .. } => {
                record
            }
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }
}

/// Result of one drain trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Queue was empty; no submission made
    NothingToSync,

    /// Another drain was in flight; this trigger was coalesced into it
    AlreadySyncing,

    /// Batch accepted; `pending` counts records appended meanwhile
    Synced { delivered: usize, pending: usize },

    /// Batch rejected; queue untouched
    Failed { error: RemoteError, pending: usize },
}

/// Notifications broadcast to observers
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Delivered { tag: String },
    Queued { tag: String, pending: usize },
    DrainStarted { trigger: SyncTrigger, batch_size: usize },
    DrainCompleted { delivered: usize, pending: usize },
    DrainFailed { error: String, pending: usize },
    DrainCoalesced { trigger: SyncTrigger },
    /// Local persistence failed; a record may have been lost
    StorageFailed { error: String },
}
