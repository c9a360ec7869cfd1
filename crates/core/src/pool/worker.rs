//! Worker loop and pool driver.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::PoolConfig;
use super::queue::{OutputNames, TrackQueue};
use super::retry::RetryPolicy;
use super::sizing::{worker_count, HostResources};
use crate::fetcher::{FetchError, FetchRequest, Fetcher};
use crate::job::{JobStore, JobToken, ProcessRegistry, StateUpdate};
use crate::metrics;
use crate::proxy::ProxyList;
use crate::track::{AudioFormat, NamingPattern, TrackRequest};

/// Highest percentage reported while tracks are still being fetched.
const MAX_IN_FLIGHT_PERCENT: usize = 98;

/// Everything a worker needs to process tracks for one job.
pub struct PoolJob {
    pub token: JobToken,
    pub output_dir: PathBuf,
    pub format: AudioFormat,
    pub naming: NamingPattern,
    pub fetcher: Arc<dyn Fetcher>,
    pub proxies: ProxyList,
    pub store: Arc<JobStore>,
    pub processes: Arc<ProcessRegistry>,
    pub cancel: CancellationToken,
    pub retry: RetryPolicy,
}

impl PoolJob {
    /// Output file for `track`, with a stem no other track of the job uses.
    fn output_path(&self, track: &TrackRequest, names: &OutputNames) -> PathBuf {
        let stem = names.reserve(&track.file_stem(&self.naming));
        self.output_dir
            .join(format!("{}.{}", stem, self.format.extension()))
    }
}

/// Summary of a finished pool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    pub total: usize,
    pub completed: usize,
    pub workers: usize,
    pub cancelled: bool,
}

/// `min(98, round(completed / total * 100))`.
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rounded = (completed * 100 + total / 2) / total;
    rounded.min(MAX_IN_FLIGHT_PERCENT) as u8
}

/// Decrements the active worker gauge when a worker exits, panics included.
struct ActiveWorker;

impl ActiveWorker {
    fn enter() -> Self {
        metrics::ACTIVE_WORKERS.inc();
        Self
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        metrics::ACTIVE_WORKERS.dec();
    }
}

/// Sizes and runs the workers for a job.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    /// Worker count for `total_tracks` given the current host.
    pub fn size_for(&self, total_tracks: usize) -> usize {
        let host = HostResources::detect();
        let workers = worker_count(&host, total_tracks, &self.config);
        info!(
            "Using {} workers (cores: {}, free memory: {} MB, tracks: {})",
            workers, host.cores, host.free_memory_mb, total_tracks
        );
        workers
    }

    /// Drains `tracks` with a pool sized from host resources.
    pub async fn run(&self, job: Arc<PoolJob>, tracks: Vec<TrackRequest>) -> PoolReport {
        let workers = self.size_for(tracks.len());
        Self::run_with_workers(job, tracks, workers).await
    }

    /// Drains `tracks` with exactly `workers` workers (at least one).
    ///
    /// Returns once every worker has exited: the queue is empty or the job
    /// was cancelled and its processes have died.
    pub async fn run_with_workers(
        job: Arc<PoolJob>,
        tracks: Vec<TrackRequest>,
        workers: usize,
    ) -> PoolReport {
        let total = tracks.len();
        let workers = workers.max(1);
        let queue = Arc::new(TrackQueue::new(tracks));
        let names = Arc::new(OutputNames::new());
        let completed = Arc::new(AtomicUsize::new(0));

        metrics::POOL_SIZE
            .with_label_values(&[])
            .observe(workers as f64);

        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker_loop(
                id,
                job.clone(),
                queue.clone(),
                names.clone(),
                completed.clone(),
            ));
        }

        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                error!("Worker for job {} panicked: {}", job.token, e);
            }
        }

        let report = PoolReport {
            total,
            completed: completed.load(Ordering::SeqCst),
            workers,
            cancelled: job.cancel.is_cancelled(),
        };
        debug!("Pool for job {} finished: {:?}", job.token, report);
        report
    }
}

async fn worker_loop(
    id: usize,
    job: Arc<PoolJob>,
    queue: Arc<TrackQueue>,
    names: Arc<OutputNames>,
    completed: Arc<AtomicUsize>,
) {
    let _active = ActiveWorker::enter();
    let mut cursor = job.proxies.cursor();
    let total = queue.total();

    loop {
        if job.cancel.is_cancelled() {
            break;
        }
        let Some(track) = queue.claim() else {
            break;
        };

        let job: &PoolJob = &job;
        let completed: &AtomicUsize = &completed;
        let query = track.search_query();
        let output_path = job.output_path(&track, &names);
        let (query, output_path) = (query.as_str(), output_path.as_path());
        let title = track.title.as_str();

        let outcome = job
            .retry
            .run(&mut cursor, &job.cancel, |proxy, attempt| {
                attempt_fetch(job, completed, total, title, query, output_path, proxy, attempt)
            })
            .await;

        if outcome.succeeded {
            completed.fetch_add(1, Ordering::SeqCst);
        } else if !job.cancel.is_cancelled() {
            warn!(
                "Worker {} dropping {:?} after {} attempts",
                id, track.title, outcome.attempts
            );
            metrics::TRACKS_DROPPED.inc();
        }
    }

    debug!("Worker {} for job {} exiting", id, job.token);
}

#[allow(clippy::too_many_arguments)]
async fn attempt_fetch(
    job: &PoolJob,
    completed: &AtomicUsize,
    total: usize,
    title: &str,
    query: &str,
    output_path: &Path,
    proxy: Option<String>,
    attempt: u32,
) -> Result<(), FetchError> {
    if job.cancel.is_cancelled() {
        return Err(FetchError::Killed);
    }

    let percent = progress_percent(completed.load(Ordering::SeqCst), total);
    job.store
        .update(
            &job.token,
            StateUpdate::progress(format!("Downloading: {}", title), percent),
        )
        .await;

    let request = FetchRequest {
        query: query.to_string(),
        output_path: output_path.to_path_buf(),
        format: job.format,
        proxy,
    };

    match job.fetcher.fetch(&request, &job.processes).await {
        Ok(_) => {
            metrics::FETCH_ATTEMPTS
                .with_label_values(&["success"])
                .inc();
            Ok(())
        }
        Err(e) => {
            debug!(
                "Attempt {} for {:?} via {:?} failed: {}",
                attempt, query, request.proxy, e
            );
            metrics::FETCH_ATTEMPTS.with_label_values(&[e.kind()]).inc();
            Err(e)
        }
    }
}
