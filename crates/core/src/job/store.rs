//! Concurrency-safe store of job records.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::broker::{ProgressBroker, Subscription};
use super::processes::ProcessRegistry;
use super::token::JobToken;
use super::types::{JobState, StateUpdate};

/// Mutable state and control handles for one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub state: JobState,
    pub cancel: CancellationToken,
    pub processes: Arc<ProcessRegistry>,
    pub created_at: DateTime<Utc>,
    /// Set once the post-terminal grace period has elapsed.
    pub released: bool,
}

impl JobRecord {
    fn new() -> Self {
        Self {
            state: JobState::starting(),
            cancel: CancellationToken::new(),
            processes: Arc::new(ProcessRegistry::new()),
            created_at: Utc::now(),
            released: false,
        }
    }
}

/// All live job records plus their progress topics.
///
/// Readers (status queries) take the read lock; the pool and finalizer of a
/// job are the only writers for that job's record.
#[derive(Debug, Default)]
pub struct JobStore {
    records: RwLock<HashMap<JobToken, JobRecord>>,
    broker: ProgressBroker<JobToken, JobState>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record for a new job in its starting state.
    pub async fn create(&self, token: JobToken) -> JobRecord {
        let record = JobRecord::new();
        self.records.write().await.insert(token, record.clone());
        record
    }

    /// Atomically replaces the job's state and pushes it to the subscriber.
    ///
    /// A no-op (returning false) once the job is cancelled or gone, so a
    /// worker finishing after cancellation cannot report stale progress.
    pub async fn update(&self, token: &JobToken, update: StateUpdate) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(token) else {
            return false;
        };
        if record.state.cancelled || record.cancel.is_cancelled() {
            return false;
        }
        record.state = update.apply(&record.state);
        self.broker.publish(token, record.state.clone());
        true
    }

    pub async fn get(&self, token: &JobToken) -> Option<JobState> {
        self.records.read().await.get(token).map(|r| r.state.clone())
    }

    pub async fn contains(&self, token: &JobToken) -> bool {
        self.records.read().await.contains_key(token)
    }

    /// Whether the job exists and has not reached a terminal state.
    pub async fn is_running(&self, token: &JobToken) -> bool {
        self.records
            .read()
            .await
            .get(token)
            .map(|r| !r.state.done)
            .unwrap_or(false)
    }

    /// Subscribes to the job's progress.
    ///
    /// The current state is delivered first, then every later update. For a
    /// released job the stream ends right after the current state; for an
    /// unknown job it is empty.
    pub async fn subscribe(&self, token: &JobToken) -> Subscription<JobState> {
        // Holding the lock orders this against concurrent updates.
        let records = self.records.read().await;
        match records.get(token) {
            Some(record) => {
                let subscription = self.broker.subscribe(token.clone(), Some(record.state.clone()));
                if record.released {
                    self.broker.close(token);
                }
                subscription
            }
            None => Subscription::closed(),
        }
    }

    /// Flags a running job as cancelled, kills its processes, closes its
    /// subscriber and drops the record.
    ///
    /// Returns false if the job is unknown or already terminal.
    pub async fn cancel(&self, token: &JobToken) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(token) else {
            return false;
        };
        if record.state.done || record.state.cancelled {
            return false;
        }

        record.state.cancelled = true;
        record.cancel.cancel();
        let killed = record.processes.kill_all();
        crate::metrics::PROCESSES_KILLED.inc_by(killed as u64);
        self.broker.close(token);
        records.remove(token);

        info!("Cancelled job {} ({} processes killed)", token, killed);
        true
    }

    /// Ends the post-terminal phase: closes the subscriber and forgets the
    /// process handles. The state record stays for status queries.
    pub async fn release(&self, token: &JobToken) {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(token) {
            record.released = true;
            record.processes.release();
        }
        self.broker.close(token);
        debug!("Released job {}", token);
    }

    /// Removes the record entirely, closing any subscriber.
    pub async fn remove(&self, token: &JobToken) -> bool {
        let removed = self.records.write().await.remove(token).is_some();
        self.broker.close(token);
        removed
    }

    pub async fn tokens(&self) -> Vec<JobToken> {
        self.records.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Finished jobs created before `cutoff`.
    pub async fn finished_before(&self, cutoff: DateTime<Utc>) -> Vec<JobToken> {
        self.records
            .read()
            .await
            .iter()
            .filter(|(_, r)| r.state.done && r.created_at < cutoff)
            .map(|(token, _)| token.clone())
            .collect()
    }

    /// Number of jobs that have not reached a terminal state.
    pub async fn running_count(&self) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|r| !r.state.done)
            .count()
    }
}
