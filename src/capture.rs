//! Event capture
//!
//! Turns a raw scan (keyboard-wedge RFID reader, QR payload, manual entry)
//! into a canonical [`AttendanceRecord`]. Capture never touches the queue or
//! the network; delivery is the orchestrator's job.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{AttendanceRecord, AttendanceStatus};

/// Errors produced while normalizing raw input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Input was empty after trimming
    #[error("Scan input is empty")]
    EmptyInput,
}

/// Normalize `raw` and stamp it with the current wall-clock time
pub fn capture(raw: &str) -> Result<AttendanceRecord, CaptureError> {
    capture_at(raw, Utc::now())
}

/// Normalize `raw` and stamp it with `at`
pub fn capture_at(raw: &str, at: DateTime<Utc>) -> Result<AttendanceRecord, CaptureError> {
    let tag = raw.trim();
    if tag.is_empty() {
        return Err(CaptureError::EmptyInput);
    }

    Ok(AttendanceRecord::new(
        tag.to_string(),
        AttendanceStatus::Present,
        at,
    ))
}
