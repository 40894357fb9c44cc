// Core data structures for rollcall

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single attendance event, immutable once captured
///
/// The wire shape matches the remote `attendance` collection:
/// `{"id", "rfid_tag", "status", "timestamp", "date"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Client-generated idempotency key
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,

    /// Subject identifier (RFID token or QR payload), trimmed and non-empty
    #[serde(rename = "rfid_tag", alias = "tag")]
    tag: String,

    status: AttendanceStatus,

    /// ISO-8601 UTC instant with millisecond precision
    #[serde(with = "timestamp_format")]
    timestamp: DateTime<Utc>,

    /// Date component of `timestamp`, used as a partition key
    date: NaiveDate,
}

impl AttendanceRecord {
    /// Build a record stamped at `timestamp`. Callers go through
    /// [`crate::capture`] which enforces the tag invariants.
    pub(crate) fn new(tag: String, status: AttendanceStatus, timestamp: DateTime<Utc>) -> Self {
        // Wire precision is milliseconds; keep the in-memory value identical
        // to what a reload from storage produces.
        let timestamp = timestamp.trunc_subsecs(3);
        Self {
            id: Uuid::new_v4(),
            tag,
            status,
            timestamp,
            date: timestamp.date_naive(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn status(&self) -> &AttendanceStatus {
        &self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp rendered the way it is sent on the wire
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl std::fmt::Display for AttendanceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} @ {}", self.tag, self.status, self.timestamp_iso())
    }
}

/// Attendance status; only `Present` is produced today
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttendanceStatus {
    Present,
    Other(String),
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Present => "Present",
            Self::Other(s) => s,
        }
    }
}

impl Default for AttendanceStatus {
    fn default() -> Self {
        Self::Present
    }
}

impl From<String> for AttendanceStatus {
    fn from(s: String) -> Self {
        if s == "Present" {
            Self::Present
        } else {
            Self::Other(s)
        }
    }
}

impl From<AttendanceStatus> for String {
    fn from(status: AttendanceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-visible status of the sync path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Nothing in flight
    Idle,
    /// A freshly captured record is being delivered directly
    Submitting,
    /// The offline queue is being drained
    Syncing,
    /// Last direct delivery was accepted
    Delivered,
    /// Last record was queued locally
    SavedOffline,
    /// Last drain was accepted and the queue cleared
    SyncComplete,
    /// Last drain was rejected; records stay queued
    SyncFailed,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Submitting => write!(f, "Submitting..."),
            Self::Syncing => write!(f, "Syncing..."),
            Self::Delivered => write!(f, "Success"),
            Self::SavedOffline => write!(f, "Saved Offline"),
            Self::SyncComplete => write!(f, "Sync Complete"),
            Self::SyncFailed => write!(f, "Sync Failed - Will retry"),
        }
    }
}

/// Snapshot published to status subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusReport {
    pub status: SyncStatus,
    pub pending: usize,
    pub online: bool,
}

mod timestamp_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
