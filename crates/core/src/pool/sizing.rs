//! Worker count from host resources.

use sysinfo::System;
use tracing::debug;

use super::config::PoolConfig;

/// Snapshot of the resources the pool is sized against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub cores: usize,
    pub free_memory_mb: u64,
}

impl HostResources {
    /// Reads the current core count and available memory.
    pub fn detect() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut system = System::new();
        system.refresh_memory();
        let free_memory_mb = system.available_memory() / 1024 / 1024;

        debug!("Host: {} cores, {} MB available", cores, free_memory_mb);
        Self {
            cores,
            free_memory_mb,
        }
    }
}

/// Number of workers for a job of `total_tracks`.
///
/// `min(cores * workers_per_core, free_mb / memory_per_worker_mb,
/// total_tracks, max_workers)`, never below 1.
pub fn worker_count(host: &HostResources, total_tracks: usize, config: &PoolConfig) -> usize {
    let by_cores = host.cores.saturating_mul(config.workers_per_core);
    let by_memory = (host.free_memory_mb / config.memory_per_worker_mb.max(1))
        .try_into()
        .unwrap_or(usize::MAX);

    let mut workers = by_cores.min(by_memory).min(total_tracks);
    if let Some(max) = config.max_workers {
        workers = workers.min(max);
    }
    workers.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(cores: usize, free_memory_mb: u64) -> HostResources {
        HostResources {
            cores,
            free_memory_mb,
        }
    }

    #[test]
    fn test_bounded_by_cores() {
        let cfg = PoolConfig::default();
        assert_eq!(worker_count(&host(4, 64_000), 100, &cfg), 8);
    }

    #[test]
    fn test_bounded_by_memory() {
        let cfg = PoolConfig::default();
        // 1000 MB / 150 MB = 6
        assert_eq!(worker_count(&host(16, 1000), 100, &cfg), 6);
    }

    #[test]
    fn test_bounded_by_tracks() {
        let cfg = PoolConfig::default();
        assert_eq!(worker_count(&host(16, 64_000), 3, &cfg), 3);
    }

    #[test]
    fn test_bounded_by_max_workers() {
        let cfg = PoolConfig {
            max_workers: Some(2),
            ..Default::default()
        };
        assert_eq!(worker_count(&host(16, 64_000), 100, &cfg), 2);
    }

    #[test]
    fn test_never_below_one() {
        let cfg = PoolConfig::default();
        assert_eq!(worker_count(&host(8, 100), 10, &cfg), 1);
        assert_eq!(worker_count(&host(8, 64_000), 0, &cfg), 1);
    }

    #[test]
    fn test_bounds_hold_across_inputs() {
        let cfg = PoolConfig::default();
        for cores in [1, 2, 3, 8, 32] {
            for free in [150, 299, 1200, 8000, 128_000] {
                for n in [1, 2, 5, 17, 200] {
                    let w = worker_count(&host(cores, free), n, &cfg);
                    assert!(w >= 1);
                    assert!(w <= n);
                    assert!(w <= cores * 2);
                    assert!(w as u64 <= free / 150);
                }
            }
        }
    }

    #[test]
    fn test_detect_reports_at_least_one_core() {
        assert!(HostResources::detect().cores >= 1);
    }
}
