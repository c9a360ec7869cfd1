//! Bounded retries with proxy rotation or cooldown between attempts.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::config::RetryConfig;
use crate::fetcher::FetchError;
use crate::proxy::ProxyCursor;

/// Result of driving one track through the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    pub succeeded: bool,
    pub attempts: u32,
}

/// Up to `max_attempts` tries per track. After a failure the worker's
/// proxy cursor advances and the next attempt starts immediately; with no
/// proxies the policy waits `cooldown` instead. Errors that no further
/// attempt can fix ([`FetchError::is_retryable`]) end the track at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub cooldown: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, cooldown: Duration) -> Self {
        Self {
            max_attempts,
            cooldown,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.cooldown_ms))
    }

    /// Drives `attempt` until it succeeds, attempts run out or `cancel` fires.
    ///
    /// `attempt` receives the proxy to use and the 1-based attempt number.
    /// Failure is reported in the outcome, never propagated.
    pub async fn run<F, Fut>(
        &self,
        cursor: &mut ProxyCursor,
        cancel: &CancellationToken,
        mut attempt: F,
    ) -> RetryOutcome
    where
        F: FnMut(Option<String>, u32) -> Fut,
        Fut: Future<Output = Result<(), FetchError>>,
    {
        let mut attempts = 0;

        while attempts < self.max_attempts {
            if cancel.is_cancelled() {
                break;
            }
            attempts += 1;

            let proxy = cursor.current().map(str::to_string);
            match attempt(proxy, attempts).await {
                Ok(()) => {
                    return RetryOutcome {
                        succeeded: true,
                        attempts,
                    };
                }
                Err(e) if !e.is_retryable() => {
                    if !matches!(e, FetchError::Killed) {
                        warn!("Giving up after attempt {}: {}", attempts, e);
                    }
                    break;
                }
                Err(_) => {}
            }

            if cursor.has_proxies() {
                cursor.advance();
            } else if attempts < self.max_attempts {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.cooldown) => {}
                }
            }
        }

        RetryOutcome {
            succeeded: false,
            attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
