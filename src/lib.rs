//! rollcall - Offline-resilient attendance capture and sync
//!
//! Captures attendance scans, delivers them to a remote collection when the
//! network is up, and persists them in a durable local queue when it is not.
//! The queue is drained as a single batch whenever connectivity returns.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`capture`] - Turning raw scanner input into attendance records
//! - [`models`] - Core data structures and status types
//! - [`storage`] - Key-value backends (SQLite, file, memory) and the durable queue
//! - [`sink`] - Remote sink trait and the REST implementation
//! - [`connectivity`] - Online/offline state, probes, change notification
//! - [`sync`] - Orchestration of direct delivery, queueing and draining
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Retry helpers and small utilities
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rollcall::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = rollcall::storage::open_store(&config.storage)?;
//!     let queue = DurableQueue::open(store, config.storage.queue_key.clone())?;
//!     let sink = Arc::new(RestSink::new(&config.sink)?);
//!     let monitor = ConnectivityMonitor::from_signal(None);
//!
//!     let orchestrator = SyncOrchestrator::new(queue, sink, monitor);
//!     let outcome = orchestrator.record_scan("04A1B2C3").await?;
//!     println!("{}", outcome.record());
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod metrics;
pub mod models;
pub mod sink;
pub mod storage;
pub mod sync;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::capture::{capture, CaptureError};
    pub use crate::config::Config;
    pub use crate::connectivity::{ConnectivityMonitor, ConnectivityProbe, HttpProbe};
    pub use crate::error::{Error, ErrorCategory, Result, RollcallErrorTrait};
    pub use crate::models::{AttendanceRecord, AttendanceStatus, StatusReport, SyncStatus};
    pub use crate::sink::{RemoteError, RemoteSink, RestSink};
    pub use crate::storage::{DurableQueue, KeyValueStore, StorageError};
    pub use crate::sync::{ScanOutcome, SyncEvent, SyncOrchestrator, SyncOutcome, SyncTrigger};
}

// Direct re-exports for convenience
pub use models::{AttendanceRecord, AttendanceStatus, StatusReport, SyncStatus};
pub use sync::SyncOrchestrator;
