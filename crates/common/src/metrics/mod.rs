//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Newsdesk metrics
pub const METRICS_PREFIX: &str = "newsdesk";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s - headline deadline
    15.00,  // 15s - search deadline
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Upstream provider metrics
    describe_counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total news provider requests"
    );

    describe_histogram!(
        format!("{}_upstream_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "News provider latency in seconds"
    );

    describe_counter!(
        format!("{}_upstream_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total news provider failures"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    // Preference metrics
    describe_counter!(
        format!("{}_preference_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Total preference replacements"
    );

    // Activity log metrics
    describe_counter!(
        format!("{}_activity_log_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Usage and search log writes that were dropped"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Milliseconds since [`RequestMetrics::start`]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a news provider round trip
pub fn record_upstream(endpoint: &str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_upstream_requests_total", METRICS_PREFIX),
        "endpoint" => endpoint.to_string(),
        "status" => status
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_upstream_duration_seconds", METRICS_PREFIX),
            "endpoint" => endpoint.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_upstream_errors_total", METRICS_PREFIX),
            "endpoint" => endpoint.to_string()
        )
        .increment(1);
    }
}

/// Helper to record search metrics
pub fn record_search(source: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .increment(1);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "source" => source.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record a preference replacement
pub fn record_preference_write(anonymous: bool) {
    let scope = if anonymous { "session" } else { "user" };
    counter!(
        format!("{}_preference_writes_total", METRICS_PREFIX),
        "scope" => scope
    )
    .increment(1);
}

/// Helper to record a dropped activity log write
pub fn record_activity_failure(kind: &'static str) {
    counter!(
        format!("{}_activity_log_failures_total", METRICS_PREFIX),
        "kind" => kind
    )
    .increment(1);
}
