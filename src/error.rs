//! Unified error handling for the rollcall crate
//!
//! Each component owns a narrow error type ([`CaptureError`], [`RemoteError`],
//! [`StorageError`]); this module folds them into a single [`Error`] for
//! callers that cross component boundaries.
//!
//! # Architecture
//!
//! - [`RollcallErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use rollcall::error::{Error, ErrorCategory, RollcallErrorTrait};
//!
//! fn report(err: &Error) {
//!     match err.category() {
//!         ErrorCategory::Storage => tracing::error!(error = %err, "Local persistence failed"),
//!         _ if err.is_recoverable() => tracing::warn!(error = %err, "Will retry"),
//!         _ => tracing::error!(error = %err, "Giving up"),
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::capture::CaptureError;
pub use crate::sink::RemoteError;
pub use crate::storage::StorageError;

/// Common trait for all rollcall error types
pub trait RollcallErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Rejected input (empty scan)
    Validation,
    /// Remote sink and connectivity errors
    Network,
    /// Local persistence errors
    Storage,
    /// Configuration and validation errors
    Config,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Network => write!(f, "network"),
            Self::Storage => write!(f, "storage"),
            Self::Config => write!(f, "config"),
        }
    }
}

impl RollcallErrorTrait for CaptureError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

impl RollcallErrorTrait for RemoteError {
    fn is_recoverable(&self) -> bool {
        // Records stay queued whatever the cause; this only decides in-call retries
        self.is_transient()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl RollcallErrorTrait for StorageError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Unavailable(_))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Unified error type for the rollcall crate
#[derive(Error, Debug)]
pub enum Error {
    /// Scan input rejected
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Remote sink errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Local persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration loading and validation errors
    #[error("Config error: {0}")]
    Config(String),
}

impl RollcallErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Capture(e) => e.is_recoverable(),
            Self::Remote(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Capture(e) => e.category(),
            Self::Remote(e) => e.category(),
            Self::Storage(e) => e.category(),
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
