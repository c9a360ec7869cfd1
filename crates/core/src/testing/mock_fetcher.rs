//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, FetchRequest, Fetcher};
use crate::job::ProcessRegistry;

/// How the mock answers fetches for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBehavior {
    /// Write the output file and succeed.
    Succeed,
    /// Fail the first `n` attempts, then succeed.
    FailTimes(u32),
    /// Never succeed.
    AlwaysFail,
    /// Fail as if the tool binary were not installed.
    BinaryMissing,
    /// Block until the kill switch trips.
    HangUntilKilled,
}

/// A recorded fetch attempt for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFetch {
    pub query: String,
    pub output_path: PathBuf,
    pub proxy: Option<String>,
    /// 1-based attempt number for this query.
    pub attempt: u32,
}

/// Mock implementation of the Fetcher trait.
///
/// Provides controllable behavior for testing:
/// - Scripted outcome per search query, with a default for the rest
/// - Records every attempt with the proxy it used
/// - Registers a process handle per attempt and honors its kill switch
/// - Tracks peak concurrency
///
/// # Example
///
/// ```rust,ignore
/// use spotitools_core::testing::{FetchBehavior, MockFetcher};
///
/// let fetcher = MockFetcher::new();
/// fetcher.set_behavior("Artist - Broken audio", FetchBehavior::AlwaysFail).await;
///
/// // Run a job...
///
/// assert_eq!(fetcher.attempts_for("Artist - Broken audio").await, 5);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    default_behavior: Arc<RwLock<FetchBehavior>>,
    behaviors: Arc<RwLock<HashMap<String, FetchBehavior>>>,
    attempts: Arc<RwLock<HashMap<String, u32>>>,
    recorded: Arc<RwLock<Vec<RecordedFetch>>>,
    delay_ms: Arc<RwLock<u64>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a> {
    current: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(current: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self { current }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockFetcher {
    /// Create a mock that succeeds for every query.
    pub fn new() -> Self {
        Self {
            default_behavior: Arc::new(RwLock::new(FetchBehavior::Succeed)),
            behaviors: Arc::new(RwLock::new(HashMap::new())),
            attempts: Arc::new(RwLock::new(HashMap::new())),
            recorded: Arc::new(RwLock::new(Vec::new())),
            delay_ms: Arc::new(RwLock::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the behavior for queries without a specific one.
    pub async fn set_default_behavior(&self, behavior: FetchBehavior) {
        *self.default_behavior.write().await = behavior;
    }

    /// Set the behavior for one search query.
    pub async fn set_behavior(&self, query: impl Into<String>, behavior: FetchBehavior) {
        self.behaviors.write().await.insert(query.into(), behavior);
    }

    /// Set a simulated duration for every attempt.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay_ms.write().await = delay.as_millis() as u64;
    }

    /// Get all recorded attempts.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.recorded.read().await.clone()
    }

    /// Number of attempts made for `query`.
    pub async fn attempts_for(&self, query: &str) -> u32 {
        self.attempts.read().await.get(query).copied().unwrap_or(0)
    }

    /// Total attempts across all queries.
    pub async fn total_attempts(&self) -> usize {
        self.recorded.read().await.len()
    }

    /// Attempts currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of attempts that ran at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` attempts are running at once.
    pub async fn wait_for_in_flight(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.in_flight() < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    async fn behavior_for(&self, query: &str) -> FetchBehavior {
        match self.behaviors.read().await.get(query) {
            Some(behavior) => *behavior,
            None => *self.default_behavior.read().await,
        }
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        processes: &ProcessRegistry,
    ) -> Result<PathBuf, FetchError> {
        let attempt = {
            let mut attempts = self.attempts.write().await;
            let count = attempts.entry(request.query.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.recorded.write().await.push(RecordedFetch {
            query: request.query.clone(),
            output_path: request.output_path.clone(),
            proxy: request.proxy.clone(),
            attempt,
        });

        let behavior = self.behavior_for(&request.query).await;
        let switch = processes.register(None, format!("mock: {}", request.query));
        let _in_flight = InFlight::enter(&self.in_flight, &self.max_in_flight);

        let succeed = match behavior {
            FetchBehavior::Succeed => true,
            FetchBehavior::FailTimes(n) => attempt > n,
            FetchBehavior::AlwaysFail => false,
            FetchBehavior::BinaryMissing => {
                return Err(FetchError::BinaryNotFound {
                    path: PathBuf::from("yt-dlp"),
                });
            }
            FetchBehavior::HangUntilKilled => {
                switch.killed().await;
                return Err(FetchError::Killed);
            }
        };

        let delay = Duration::from_millis(*self.delay_ms.read().await);
        tokio::select! {
            biased;
            _ = switch.killed() => return Err(FetchError::Killed),
            _ = tokio::time::sleep(delay) => {}
        }

        if succeed {
            tokio::fs::write(&request.output_path, request.query.as_bytes()).await?;
            Ok(request.output_path.clone())
        } else {
            Err(FetchError::exited(Some(1), "mock failure"))
        }
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
