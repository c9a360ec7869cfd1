//! Prometheus metrics for the HTTP layer.
//!
//! - HTTP request metrics (latency, counts, in flight)
//! - Progress stream (SSE) connection metrics
//! - Job table gauges (collected on scrape)
//!
//! Core job and fetch metrics are registered here as well so a single
//! `/metrics` endpoint exposes everything.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "spotitools_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spotitools_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spotitools_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Progress Stream Metrics
// =============================================================================

/// Open progress streams.
pub static SSE_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "spotitools_sse_connections_active",
        "Number of open progress streams",
    )
    .unwrap()
});

/// Progress streams opened since startup.
pub static SSE_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spotitools_sse_connections_total",
        "Total progress streams since startup",
    )
    .unwrap()
});

/// Progress frames pushed to clients.
pub static SSE_FRAMES_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spotitools_sse_frames_sent_total",
        "Progress frames sent to clients",
    )
    .unwrap()
});

// =============================================================================
// Job Table (collected dynamically)
// =============================================================================

/// Jobs that have not reached a terminal state.
pub static JOBS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("spotitools_jobs_running", "Jobs not yet in a terminal state").unwrap()
});

/// Job records held in memory (running and retained).
pub static JOB_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("spotitools_job_records", "Job records held in memory").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Progress streams
    registry
        .register(Box::new(SSE_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(SSE_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(SSE_FRAMES_SENT.clone())).unwrap();

    // Job table
    registry.register(Box::new(JOBS_RUNNING.clone())).unwrap();
    registry.register(Box::new(JOB_RECORDS.clone())).unwrap();

    // Core metrics (jobs, pool, fetcher)
    for metric in spotitools_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh the job table gauges before a scrape.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let store = state.manager().store();
    JOBS_RUNNING.set(store.running_count().await as i64);
    JOB_RECORDS.set(store.len().await as i64);
}

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-f]{64}").unwrap());
static FILE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\{token\}/.+$").unwrap());

/// Normalize a path for metric labels.
///
/// Job tokens become `{token}`, and anything below a token that is not one
/// of the API sub-resources (a served download file) becomes `{file}`.
pub fn normalize_path(path: &str) -> String {
    let result = TOKEN_REGEX.replace_all(path, "{token}");
    if result.ends_with("/{token}/status") || result.ends_with("/{token}/progress") {
        return result.to_string();
    }
    FILE_REGEX.replace(&result, "/{token}/{file}").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "3f2a9c0d3f2a9c0d3f2a9c0d3f2a9c0d3f2a9c0d3f2a9c0d3f2a9c0d3f2a9c0d";

    #[test]
    fn test_normalize_path_status() {
        let path = format!("/api/v1/downloads/{}/status", TOKEN);
        assert_eq!(normalize_path(&path), "/api/v1/downloads/{token}/status");
    }

    #[test]
    fn test_normalize_path_progress() {
        let path = format!("/api/v1/downloads/{}/progress", TOKEN);
        assert_eq!(normalize_path(&path), "/api/v1/downloads/{token}/progress");
    }

    #[test]
    fn test_normalize_path_download_file() {
        let path = format!("/downloads/{}/Some%20Song.mp3", TOKEN);
        assert_eq!(normalize_path(&path), "/downloads/{token}/{file}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(
            normalize_path("/api/v1/downloads/cancel"),
            "/api/v1/downloads/cancel"
        );
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("spotitools_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        SSE_CONNECTIONS_ACTIVE.set(0);
        SSE_CONNECTIONS_TOTAL.inc();
        SSE_FRAMES_SENT.inc();
        JOBS_RUNNING.set(0);
        JOB_RECORDS.set(0);
        spotitools_core::metrics::JOBS_STARTED.inc();

        let output = encode_metrics();

        assert!(output.contains("spotitools_http_request_duration_seconds"));
        assert!(output.contains("spotitools_http_requests_in_flight"));
        assert!(output.contains("spotitools_sse_connections_active"));
        assert!(output.contains("spotitools_sse_connections_total"));
        assert!(output.contains("spotitools_sse_frames_sent_total"));
        assert!(output.contains("spotitools_jobs_running"));
        assert!(output.contains("spotitools_job_records"));
        assert!(output.contains("spotitools_jobs_started_total"));
    }
}
