//! Job lifecycle manager.
//!
//! Owns the [`JobStore`], spawns one supervised task per job (pool, then
//! finalizer, then grace period) and runs the retention sweep over the
//! download root.

mod error;
mod types;

pub use error::JobError;
pub use types::JobRequest;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DownloadsConfig};
use crate::fetcher::Fetcher;
use crate::finalize::Finalizer;
use crate::job::{JobRecord, JobState, JobStatus, JobStore, JobToken, Subscription};
use crate::metrics;
use crate::pool::{PoolJob, RetryPolicy, WorkerPool};
use crate::proxy::ProxyList;

/// Creates, runs, cancels and expires jobs.
///
/// Cheap to clone; clones share the same store and task table.
#[derive(Clone)]
pub struct JobManager {
    downloads: DownloadsConfig,
    pool: WorkerPool,
    retry: RetryPolicy,
    fetcher: Arc<dyn Fetcher>,
    proxies: ProxyList,
    store: Arc<JobStore>,
    finalizer: Finalizer,
    tasks: Arc<Mutex<HashMap<JobToken, JoinHandle<()>>>>,
    shutdown: CancellationToken,
}

impl JobManager {
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>, proxies: ProxyList) -> Self {
        Self {
            downloads: config.downloads.clone(),
            pool: WorkerPool::new(config.pool.clone()),
            retry: RetryPolicy::from_config(&config.retry),
            fetcher,
            proxies,
            store: Arc::new(JobStore::new()),
            finalizer: Finalizer::new(config.downloads.url_prefix.clone()),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<JobToken, JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn downloads(&self) -> &DownloadsConfig {
        &self.downloads
    }

    /// Directory holding the files of `token`.
    pub fn job_dir(&self, token: &JobToken) -> PathBuf {
        self.downloads.root.join(token.as_str())
    }

    /// Starts a job and returns its token without waiting for any work.
    pub async fn start_job(&self, request: JobRequest) -> Result<JobToken, JobError> {
        if request.tracks.is_empty() {
            return Err(JobError::EmptyTrackList);
        }
        if self.shutdown.is_cancelled() {
            return Err(JobError::ShuttingDown);
        }

        let token = JobToken::generate();
        let dir = self.job_dir(&token);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| JobError::CreateDirectory {
                path: dir.clone(),
                source,
            })?;

        let record = self.store.create(token.clone()).await;
        metrics::JOBS_STARTED.inc();
        info!(
            "Starting job {} ({} tracks, format {})",
            token,
            request.tracks.len(),
            request.format
        );

        // The task removes its own handle when done; holding the lock across
        // the spawn keeps that removal after the insert.
        let mut tasks = self.tasks();
        let manager = self.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            manager.run_job(task_token, dir, record, request).await;
        });
        tasks.insert(token.clone(), handle);

        Ok(token)
    }

    async fn run_job(self, token: JobToken, dir: PathBuf, record: JobRecord, request: JobRequest) {
        let started = Instant::now();
        let job = Arc::new(PoolJob {
            token: token.clone(),
            output_dir: dir.clone(),
            format: request.format,
            naming: request.naming.clone(),
            fetcher: self.fetcher.clone(),
            proxies: self.proxies.clone(),
            store: self.store.clone(),
            processes: record.processes.clone(),
            cancel: record.cancel.clone(),
            retry: self.retry,
        });

        let report = self.pool.run(job, request.tracks).await;
        info!(
            "Job {}: {}/{} tracks fetched with {} workers",
            token, report.completed, report.total, report.workers
        );

        let label = if record.cancel.is_cancelled() {
            remove_path(&dir).await;
            "cancelled"
        } else {
            let outcome = self
                .finalizer
                .finalize(&self.store, &token, &dir, request.format, &request.title)
                .await;

            if record.cancel.is_cancelled() {
                // Cancelled while archiving.
                remove_path(&dir).await;
                "cancelled"
            } else {
                let grace = Duration::from_millis(self.downloads.finalize_grace_ms);
                tokio::select! {
                    _ = tokio::time::sleep(grace) => {}
                    _ = self.shutdown.cancelled() => {}
                }
                self.store.release(&token).await;
                outcome.label()
            }
        };

        metrics::JOBS_FINISHED.with_label_values(&[label]).inc();
        metrics::JOB_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());
        debug!("Job {} task finished ({})", token, label);

        self.tasks().remove(&token);
    }

    /// Cancels a running job: kills its processes and drops its record. The
    /// directory is removed once every worker has exited.
    pub async fn cancel_job(&self, token: &JobToken) -> bool {
        self.store.cancel(token).await
    }

    /// Live state of the job, or whether its directory is still on disk.
    pub async fn status(&self, token: &JobToken) -> JobStatus {
        match self.store.get(token).await {
            Some(state) => JobStatus::active(state),
            None => {
                let exists = tokio::fs::try_exists(self.job_dir(token))
                    .await
                    .unwrap_or(false);
                JobStatus::inactive(exists)
            }
        }
    }

    pub async fn state(&self, token: &JobToken) -> Option<JobState> {
        self.store.get(token).await
    }

    /// Current state first, then every update until the job is released or
    /// cancelled.
    pub async fn subscribe(&self, token: &JobToken) -> Subscription<JobState> {
        self.store.subscribe(token).await
    }

    /// Waits for the job's task to finish. Returns immediately for unknown
    /// or already finished jobs.
    pub async fn join(&self, token: &JobToken) {
        let handle = self.tasks().remove(token);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Job task {} failed: {}", token, e);
            }
        }
    }

    pub fn running_tasks(&self) -> usize {
        self.tasks().len()
    }

    /// Spawns the periodic retention sweep. Stops on [`shutdown`](Self::shutdown).
    pub fn spawn_retention_sweep(&self) -> JoinHandle<()> {
        let manager = self.clone();
        let period = Duration::from_secs(self.downloads.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = manager.sweep_expired().await;
                        if removed > 0 {
                            info!("Retention sweep removed {} entries", removed);
                        }
                    }
                }
            }
            debug!("Retention sweep stopped");
        })
    }

    /// Removes download-root entries and records older than the retention window.
    pub async fn sweep_expired(&self) -> usize {
        let max_age = Duration::from_secs(self.downloads.retention_hours * 3600);
        self.sweep_older_than(max_age).await
    }

    /// Removes entries of the download root whose modification time is older
    /// than `max_age`, skipping running jobs, plus finished records older
    /// than `max_age`.
    pub async fn sweep_older_than(&self, max_age: Duration) -> usize {
        let mut removed = 0;

        match tokio::fs::read_dir(&self.downloads.root).await {
            Ok(mut entries) => loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Retention sweep stopped reading {:?}: {}", self.downloads.root, e);
                        break;
                    }
                };

                let token = entry
                    .file_name()
                    .to_str()
                    .and_then(|name| JobToken::parse(name).ok());
                if let Some(token) = &token {
                    if self.store.is_running(token).await {
                        continue;
                    }
                }

                let age = match entry.metadata().await.and_then(|m| m.modified()) {
                    Ok(modified) => SystemTime::now()
                        .duration_since(modified)
                        .unwrap_or_default(),
                    Err(e) => {
                        debug!("Skipping {:?}: {}", entry.path(), e);
                        continue;
                    }
                };
                if age <= max_age {
                    continue;
                }

                debug!("Expiring {:?} (age {:?})", entry.path(), age);
                remove_path(&entry.path()).await;
                if let Some(token) = &token {
                    self.store.remove(token).await;
                }
                removed += 1;
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Retention sweep cannot read {:?}: {}", self.downloads.root, e),
        }

        if let Ok(max_age) = chrono::Duration::from_std(max_age) {
            for token in self.store.finished_before(chrono::Utc::now() - max_age).await {
                self.store.remove(&token).await;
            }
        }

        removed
    }

    /// Stops the sweep, cancels every running job and waits for their tasks.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let mut cancelled = 0;
        for token in self.store.tokens().await {
            if self.store.cancel(&token).await {
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!("Cancelled {} running jobs on shutdown", cancelled);
        }

        let handles: Vec<(JobToken, JoinHandle<()>)> = self.tasks().drain().collect();
        for (token, handle) in handles {
            if let Err(e) = handle.await {
                error!("Job task {} failed during shutdown: {}", token, e);
            }
        }
    }
}

async fn remove_path(path: &Path) {
    let result = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {:?}: {}", path, e),
    }
}
