//! Prometheus metrics for decoy.
//!
//! Tracks mock traffic, matching latency and the size of the expectation store.
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram, Counter,
    CounterVec, Encoder, Gauge, Histogram, TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Requests received by the mock listener
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "decoy_requests_total",
        "Total number of requests received by the mock listener",
        &["method", "outcome"]  // outcome: respond|forward|callback|unmatched|rejected
    )
    .unwrap();

    /// Expectations accepted by the admin API
    pub static ref EXPECTATIONS_REGISTERED_TOTAL: Counter = register_counter!(
        "decoy_expectations_registered_total",
        "Total number of expectations registered"
    )
    .unwrap();

    /// Time spent scanning the store for a match
    pub static ref MATCH_DURATION_MS: Histogram = register_histogram!(
        "decoy_match_duration_ms",
        "Histogram of expectation matching time in milliseconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 50.0]
    )
    .unwrap();

    /// Expectations currently held by the store
    pub static ref ACTIVE_EXPECTATIONS: Gauge = register_gauge!(
        "decoy_active_expectations",
        "Number of active expectations in the store"
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record a mock request and how it was handled
pub fn record_request(method: &str, outcome: &str) {
    REQUESTS_TOTAL.with_label_values(&[method, outcome]).inc();
}

pub fn record_registered(count: usize) {
    EXPECTATIONS_REGISTERED_TOTAL.inc_by(count as f64);
}

pub fn observe_match_duration(ms: f64) {
    MATCH_DURATION_MS.observe(ms);
}

pub fn set_active_expectations(count: usize) {
    ACTIVE_EXPECTATIONS.set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collection() {
        record_request("GET", "respond");
        record_request("POST", "unmatched");
        record_registered(2);
        observe_match_duration(0.2);
        set_active_expectations(3);

        let metrics = collect_metrics();

        assert!(metrics.contains("decoy_requests_total"));
        assert!(metrics.contains("decoy_expectations_registered_total"));
        assert!(metrics.contains("decoy_match_duration_ms"));
        assert!(metrics.contains("decoy_active_expectations"));
    }

    #[test]
    fn test_request_labels() {
        record_request("DELETE", "forward");
        let metrics = collect_metrics();
        assert!(metrics.contains(r#"method="DELETE""#));
        assert!(metrics.contains(r#"outcome="forward""#));
    }
}
