//! Bounded worker pool that drains a job's track queue.
//!
//! The pool is sized from host resources ([`worker_count`]), every worker
//! claims tracks from a shared [`TrackQueue`] and drives the
//! [`RetryPolicy`] around the fetcher. Track-level failures are dropped,
//! never propagated.

mod config;
mod queue;
mod retry;
mod sizing;
mod worker;

pub use config::{PoolConfig, RetryConfig};
pub use queue::{OutputNames, TrackQueue};
pub use retry::{RetryOutcome, RetryPolicy};
pub use sizing::{worker_count, HostResources};
pub use worker::{progress_percent, PoolJob, PoolReport, WorkerPool};
