//! Prometheus metrics for scan and order activity.

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};

// === Metric Name Constants ===

/// Scan iterations counter metric name.
pub const METRIC_SCANS: &str = "scans_total";
/// Opportunities found counter metric name.
pub const METRIC_OPPORTUNITIES_FOUND: &str = "opportunities_found_total";
/// Orders submitted counter metric name.
pub const METRIC_ORDERS_SUBMITTED: &str = "orders_submitted_total";
/// Orders failed counter metric name.
pub const METRIC_ORDERS_FAILED: &str = "orders_failed_total";
/// Monitor ticks counter metric name.
pub const METRIC_MONITOR_TICKS: &str = "monitor_ticks_total";
/// Order submission latency metric name.
pub const METRIC_ORDER_SUBMIT_LATENCY: &str = "order_submit_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(METRIC_SCANS, "Total number of scan iterations");
    describe_counter!(
        METRIC_OPPORTUNITIES_FOUND,
        "Total number of opportunities discovered"
    );
    describe_counter!(METRIC_ORDERS_SUBMITTED, "Total number of orders submitted");
    describe_counter!(METRIC_ORDERS_FAILED, "Total number of failed order attempts");
    describe_counter!(METRIC_MONITOR_TICKS, "Total number of monitor ticks");
    describe_histogram!(
        METRIC_ORDER_SUBMIT_LATENCY,
        "Order submission latency in milliseconds"
    );
}

/// Record one scan iteration.
pub fn inc_scans() {
    counter!(METRIC_SCANS).increment(1);
}

/// Record discovered opportunities.
pub fn inc_opportunities_found(count: u64) {
    counter!(METRIC_OPPORTUNITIES_FOUND).increment(count);
}

/// Record a submitted order.
pub fn inc_orders_submitted() {
    counter!(METRIC_ORDERS_SUBMITTED).increment(1);
}

/// Record a failed order attempt.
pub fn inc_orders_failed() {
    counter!(METRIC_ORDERS_FAILED).increment(1);
}

/// Record one monitor tick.
pub fn inc_monitor_ticks() {
    counter!(METRIC_MONITOR_TICKS).increment(1);
}

/// Record order submission latency from a start instant.
pub fn record_order_submit_latency(start: Instant) {
    histogram!(METRIC_ORDER_SUBMIT_LATENCY).record(start.elapsed().as_millis() as f64);
}
