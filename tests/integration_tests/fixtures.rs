//! Test fixtures for integration tests
//!
//! Provides persisted queue blobs and remote responses

/// Queue blob written before records carried an `id`
pub const LEGACY_QUEUE_BLOB: &str = r#"[
    {"rfid_tag": "04A1B2C3", "status": "Present", "timestamp": "2024-03-01T08:59:12.345Z", "date": "2024-03-01"},
    {"tag": "QR-STUDENT-17", "status": "Present", "timestamp": "2024-03-01T09:01:00.000Z", "date": "2024-03-01"}
]"#;

/// Queue blob that is not a JSON array of records
pub const CORRUPT_QUEUE_BLOB: &str = r#"{"records": "oops"#;

/// PostgREST error body for a constraint violation
pub const POSTGREST_CONFLICT_BODY: &str = r#"{
    "code": "23502",
    "details": null,
    "hint": null,
    "message": "null value in column \"rfid_tag\" violates not-null constraint"
}"#;

/// PostgREST error body for an overloaded upstream
pub const POSTGREST_UNAVAILABLE_BODY: &str = r#"{"message": "upstream connect error"}"#;
