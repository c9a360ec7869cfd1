//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job lifecycle (started, finished by result, duration)
//! - Worker pool (active workers, pool size, dropped tracks)
//! - Fetch executor (attempts by result, killed processes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs started.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("spotitools_jobs_started_total", "Total jobs started").unwrap()
});

/// Jobs finished by result.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spotitools_jobs_finished_total", "Total jobs finished"),
        &["result"], // "single", "archive", "empty", "failed", "cancelled"
    )
    .unwrap()
});

/// Wall-clock job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("spotitools_job_duration_seconds", "Duration of jobs")
            .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Worker pool
// =============================================================================

/// Workers currently running across all jobs.
pub static ACTIVE_WORKERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("spotitools_active_workers", "Workers currently running").unwrap()
});

/// Pool size chosen per job.
pub static POOL_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("spotitools_pool_size", "Number of workers per job")
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]),
        &[],
    )
    .unwrap()
});

/// Tracks dropped after exhausting their retries.
pub static TRACKS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spotitools_tracks_dropped_total",
        "Tracks dropped after all attempts failed",
    )
    .unwrap()
});

// =============================================================================
// Fetch executor
// =============================================================================

/// Fetch attempts by result.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("spotitools_fetch_attempts_total", "Total fetch attempts"),
        &["result"], // "success" or a FetchError kind
    )
    .unwrap()
});

/// External processes killed by cancellation.
pub static PROCESSES_KILLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "spotitools_processes_killed_total",
        "Fetch processes killed on cancellation",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOB_DURATION.clone()),
        // Pool
        Box::new(ACTIVE_WORKERS.clone()),
        Box::new(POOL_SIZE.clone()),
        Box::new(TRACKS_DROPPED.clone()),
        // Fetch
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(PROCESSES_KILLED.clone()),
    ]
}
