//! Prometheus metrics for the notification service.
//!
//! - Notification creation by initial status
//! - Dispatch outcomes and latency by channel type
//! - Scheduler tick and due-item counters

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

use crate::notification::{NotificationStatus, NotificationType};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_notify";

lazy_static! {
    /// Notifications persisted, by initial status
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_created_total", METRIC_PREFIX),
        "Total notifications created",
        &["status"]
    ).unwrap();

    /// Dispatch attempts by channel type and outcome
    pub static ref DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatch_total", METRIC_PREFIX),
        "Total dispatch attempts",
        &["type", "outcome"]
    ).unwrap();

    /// Transport retries performed inside a dispatch
    pub static ref DISPATCH_RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_dispatch_retries_total", METRIC_PREFIX),
        "Total transport retries",
        &["type"]
    ).unwrap();

    /// Time spent in the transport, including retries
    pub static ref DISPATCH_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_dispatch_latency_seconds", METRIC_PREFIX),
        "Dispatch latency in seconds",
        &["type"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();

    /// Scheduler ticks executed
    pub static ref SCHEDULER_TICKS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_scheduler_ticks_total", METRIC_PREFIX),
        "Total scheduler ticks"
    ).unwrap();

    /// Due notifications handled by the scheduler, by result
    pub static ref SCHEDULER_DUE_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_scheduler_due_total", METRIC_PREFIX),
        "Due notifications processed by the scheduler",
        &["result"]
    ).unwrap();
}

/// Helper for dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record(notification_type: NotificationType, success: bool, elapsed_secs: f64) {
        let outcome = if success { "success" } else { "failure" };
        DISPATCH_TOTAL
            .with_label_values(&[notification_type.as_str(), outcome])
            .inc();
        DISPATCH_LATENCY
            .with_label_values(&[notification_type.as_str()])
            .observe(elapsed_secs);
    }

    pub fn record_retry(notification_type: NotificationType) {
        DISPATCH_RETRIES_TOTAL
            .with_label_values(&[notification_type.as_str()])
            .inc();
    }

    pub fn record_created(status: NotificationStatus) {
        NOTIFICATIONS_CREATED_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
    }
}

/// Helper for scheduler metrics
pub struct SchedulerMetrics;

impl SchedulerMetrics {
    pub fn record_tick(sent: usize, failed: usize, skipped: usize) {
        SCHEDULER_TICKS_TOTAL.inc();
        SCHEDULER_DUE_TOTAL
            .with_label_values(&["sent"])
            .inc_by(sent as u64);
        SCHEDULER_DUE_TOTAL
            .with_label_values(&["failed"])
            .inc_by(failed as u64);
        SCHEDULER_DUE_TOTAL
            .with_label_values(&["skipped"])
            .inc_by(skipped as u64);
    }
}

/// Encode all registered metrics in the Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
