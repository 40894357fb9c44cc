//! Prometheus metrics for the sync path
//!
//! This module tracks:
//! - Capture: records captured, delivered directly, queued
//! - Drains: attempts, records drained, failures, duration
//! - Health: pending queue size, connectivity, storage failures
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Encoder, Histogram, IntCounter,
    IntGauge, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all sync metrics
struct SyncMetrics {
    records_captured: IntCounter,
    records_delivered_direct: IntCounter,
    records_queued: IntCounter,
    records_drained: IntCounter,
    drain_attempts: IntCounter,
    drain_failures: IntCounter,
    drain_coalesced: IntCounter,
    storage_failures: IntCounter,
    drain_duration: Histogram,
    pending_records: IntGauge,
    online: IntGauge,
}

/// Global storage for sync metrics
static SYNC_METRICS: OnceLock<SyncMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.set(true).is_err() {
        return Ok(());
    }

    let metrics = SyncMetrics {
        records_captured: register_int_counter!(
            "rollcall_records_captured_total",
            "Total attendance records captured"
        )?,
        records_delivered_direct: register_int_counter!(
            "rollcall_records_delivered_direct_total",
            "Records accepted by the sink on first submission"
        )?,
        records_queued: register_int_counter!(
            "rollcall_records_queued_total",
            "Records written to the offline queue"
        )?,
        records_drained: register_int_counter!(
            "rollcall_records_drained_total",
            "Queued records accepted by the sink during a drain"
        )?,
        drain_attempts: register_int_counter!(
            "rollcall_drain_attempts_total",
            "Queue drain attempts that reached the sink"
        )?,
        drain_failures: register_int_counter!(
            "rollcall_drain_failures_total",
            "Queue drains rejected by the sink"
        )?,
        drain_coalesced: register_int_counter!(
            "rollcall_drain_coalesced_total",
            "Drain triggers ignored because a drain was already running"
        )?,
        storage_failures: register_int_counter!(
            "rollcall_storage_failures_total",
            "Local persistence failures (possible record loss)"
        )?,
        drain_duration: register_histogram!(
            "rollcall_drain_duration_seconds",
            "Time spent submitting a drained batch",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        pending_records: register_int_gauge!(
            "rollcall_pending_records",
            "Records currently waiting in the offline queue"
        )?,
        online: register_int_gauge!(
            "rollcall_online",
            "Connectivity state (1 = online, 0 = offline)"
        )?,
    };

    SYNC_METRICS
        .set(metrics)
        .map_err(|_| "Sync metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    SYNC_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a captured record
pub fn record_captured() {
    if let Some(m) = SYNC_METRICS.get() {
        m.records_captured.inc();
    }
}

/// Record a direct delivery
pub fn record_direct_delivery() {
    if let Some(m) = SYNC_METRICS.get() {
        m.records_delivered_direct.inc();
    }
}

/// Record a record written to the queue
pub fn record_queued(pending: usize) {
    let Some(m) = SYNC_METRICS.get() else {
        return;
    };

    m.records_queued.inc();
    m.pending_records.set(pending as i64);
}

/// Record the outcome of a drain that reached the sink
pub fn record_drain(batch_size: usize, accepted: bool, duration_secs: f64, pending: usize) {
    let Some(m) = SYNC_METRICS.get() else {
        return;
    };

    m.drain_attempts.inc();
    m.drain_duration.observe(duration_secs);
    if accepted {
        m.records_drained.inc_by(batch_size as u64);
    } else {
        m.drain_failures.inc();
    }
    m.pending_records.set(pending as i64);
}

/// Record a drain trigger that was coalesced
pub fn record_drain_coalesced() {
    if let Some(m) = SYNC_METRICS.get() {
        m.drain_coalesced.inc();
    }
}

/// Record a local persistence failure
pub fn record_storage_failure() {
    if let Some(m) = SYNC_METRICS.get() {
        m.storage_failures.inc();
    }
}

/// Update the pending gauge
pub fn set_pending(pending: usize) {
    if let Some(m) = SYNC_METRICS.get() {
        m.pending_records.set(pending as i64);
    }
}

/// Update the connectivity gauge
pub fn set_online(online: bool) {
    if let Some(m) = SYNC_METRICS.get() {
        m.online.set(i64::from(online));
    }
}

// ============================================================================
// Tests
// ============================================================================
