//! Shared per-job queue of tracks still to fetch, plus the output names
//! already handed out for the job.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::track::TrackRequest;

/// FIFO of remaining tracks; [`claim`](TrackQueue::claim) is an atomic
/// remove-and-take, so no two workers ever get the same track.
#[derive(Debug)]
pub struct TrackQueue {
    remaining: Mutex<VecDeque<TrackRequest>>,
    total: usize,
}

impl TrackQueue {
    pub fn new(tracks: Vec<TrackRequest>) -> Self {
        let total = tracks.len();
        Self {
            remaining: Mutex::new(tracks.into()),
            total,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TrackRequest>> {
        self.remaining.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn claim(&self) -> Option<TrackRequest> {
        self.lock().pop_front()
    }

    /// Size of the queue at creation.
    pub fn total(&self) -> usize {
        self.total
    }
}

/// File stems reserved by the workers of one job.
///
/// Two tracks rendering to the same stem (same title by different artists,
/// or titles differing only in stripped characters) get `Stem`, `Stem (2)`,
/// `Stem (3)` and so on. Comparison ignores ASCII case so the names stay
/// distinct on case-insensitive filesystems.
#[derive(Debug, Default)]
pub struct OutputNames {
    claimed: Mutex<HashSet<String>>,
}

impl OutputNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves and returns a stem not yet used in this job.
    pub fn reserve(&self, stem: &str) -> String {
        let mut claimed = self.claimed.lock().unwrap_or_else(|e| e.into_inner());
        let mut candidate = stem.to_string();
        let mut n = 1;
        while !claimed.insert(candidate.to_ascii_lowercase()) {
            n += 1;
            candidate = format!("{} ({})", stem, n);
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn tracks(n: usize) -> Vec<TrackRequest> {
        (0..n)
            .map(|i| TrackRequest::new(format!("Track {i}"), "Artist"))
            .collect()
    }

    #[test]
    fn test_claims_in_order() {
        let queue = TrackQueue::new(tracks(2));
        assert_eq!(queue.claim().unwrap().title, "Track 0");
        assert_eq!(queue.claim().unwrap().title, "Track 1");
        assert!(queue.claim().is_none());
        assert_eq!(queue.total(), 2);
    }

    #[test]
    fn test_output_names_are_unique() {
        let names = OutputNames::new();
        assert_eq!(names.reserve("Intro"), "Intro");
        assert_eq!(names.reserve("Intro"), "Intro (2)");
        assert_eq!(names.reserve("intro"), "intro (3)");
        assert_eq!(names.reserve("Outro"), "Outro");
        // A literal "Intro (2)" title does not collide with the generated one.
        assert_eq!(names.reserve("Intro (2)"), "Intro (2) (2)");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_are_exclusive() {
        let queue = Arc::new(TrackQueue::new(tracks(500)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                while let Some(track) = queue.claim() {
                    claimed.push(track.title);
                    tokio::task::yield_now().await;
                }
                claimed
            }));
        }

        let mut seen = HashSet::new();
        let mut count = 0;
        for handle in handles {
            for title in handle.await.unwrap() {
                count += 1;
                assert!(seen.insert(title), "track claimed twice");
            }
        }
        assert_eq!(count, 500);
    }
}
