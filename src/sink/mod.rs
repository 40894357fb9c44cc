//! Remote sink for attendance records
//!
//! The sink is the remote store that durably accepts records. It is treated
//! as slow and unreliable, and as all-or-nothing per batch: any error means
//! the whole batch is retried later, even if the remote applied part of it.
//! Records carry a client-generated `id` so an idempotent sink can ignore
//! rows it already has.

pub mod rest;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::AttendanceRecord;

pub use rest::RestSink;

/// Errors returned by a sink submission
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport failure (DNS, refused connection, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the client timeout
    #[error("Request timeout")]
    Timeout,

    /// Remote answered with a non-success status
    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Sink could not be constructed from its configuration
    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),
}

impl RemoteError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            Self::InvalidConfig(_) => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Something that accepts batches of records
#[async_trait]
pub trait RemoteSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Insert every record of `records`; any error means none are considered delivered
    async fn submit_batch(&self, records: &[AttendanceRecord]) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: RemoteSink + ?Sized> RemoteSink for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn submit_batch(&self, records: &[AttendanceRecord]) -> Result<(), RemoteError> {
        (**self).submit_batch(records).await
    }
}
