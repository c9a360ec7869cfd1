//! Pool and retry configuration.

use serde::{Deserialize, Serialize};

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Workers per available core.
    #[serde(default = "default_workers_per_core")]
    pub workers_per_core: usize,

    /// Estimated peak memory of one fetch process, in megabytes.
    #[serde(default = "default_memory_per_worker")]
    pub memory_per_worker_mb: u64,

    /// Hard upper bound on workers per job.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

fn default_workers_per_core() -> usize {
    2
}

fn default_memory_per_worker() -> u64 {
    150
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers_per_core: default_workers_per_core(),
            memory_per_worker_mb: default_memory_per_worker(),
            max_workers: None,
        }
    }
}

/// Per-track retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per track, first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between attempts when there are no proxies to rotate to.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_cooldown_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}
