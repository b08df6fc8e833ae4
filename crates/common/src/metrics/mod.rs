//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Tagpress metrics
pub const METRICS_PREFIX: &str = "tagpress";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
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

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of article searches"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Article search latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from search"
    );

    // Related-ranking metrics
    describe_counter!(
        format!("{}_related_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of related-article queries"
    );

    describe_histogram!(
        format!("{}_related_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Related-article ranking latency in seconds"
    );

    // Insert metrics
    describe_counter!(
        format!("{}_articles_inserted_total", METRICS_PREFIX),
        Unit::Count,
        "Total articles inserted"
    );

    describe_counter!(
        format!("{}_insert_conflicts_total", METRICS_PREFIX),
        Unit::Count,
        "Total duplicate-title insert rejections"
    );

    // Tag index metrics
    describe_gauge!(
        format!("{}_index_tags", METRICS_PREFIX),
        Unit::Count,
        "Number of distinct tags in the tag index"
    );

    describe_gauge!(
        format!("{}_index_articles", METRICS_PREFIX),
        Unit::Count,
        "Number of articles in the tag index"
    );

    // Database metrics
    describe_histogram!(
        format!("{}_db_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Database query latency in seconds"
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

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, result_count: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Helper to record related-ranking metrics
pub fn record_related(duration_secs: f64) {
    counter!(format!("{}_related_queries_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_related_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Helper to record insert metrics
pub fn record_insert(success: bool) {
    if success {
        counter!(format!("{}_articles_inserted_total", METRICS_PREFIX)).increment(1);
    } else {
        counter!(format!("{}_insert_conflicts_total", METRICS_PREFIX)).increment(1);
    }
}

/// Helper to record tag index size
pub fn record_index_size(tags: usize, articles: usize) {
    gauge!(format!("{}_index_tags", METRICS_PREFIX)).set(tags as f64);
    gauge!(format!("{}_index_articles", METRICS_PREFIX)).set(articles as f64);
}
