//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the fetcher and resolver
//! traits so the job engine and HTTP layer can be tested without `yt-dlp`
//! or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use spotitools_core::testing::{fixtures, FetchBehavior, MockFetcher};
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! fetcher.set_behavior("Test Artist - Track 2 audio", FetchBehavior::AlwaysFail).await;
//!
//! let manager = JobManager::new(&fixtures::config(dir.path()), fetcher.clone(), ProxyList::empty());
//! let token = manager.start_job(JobRequest::new(fixtures::tracks(3))).await?;
//! manager.join(&token).await;
//! ```

mod mock_fetcher;
mod mock_resolver;

pub use mock_fetcher::{FetchBehavior, MockFetcher, RecordedFetch};
pub use mock_resolver::MockResolver;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use crate::catalog::{ContentType, ResolvedCollection};
    use crate::config::Config;
    use crate::track::TrackRequest;

    /// Artist used by [`track`] and [`tracks`].
    pub const ARTIST: &str = "Test Artist";

    /// A track by [`ARTIST`].
    pub fn track(title: &str) -> TrackRequest {
        TrackRequest::new(title, ARTIST)
    }

    /// `Track 1` .. `Track n` by [`ARTIST`].
    pub fn tracks(n: usize) -> Vec<TrackRequest> {
        (1..=n).map(|i| track(&format!("Track {}", i))).collect()
    }

    /// Search query the engine derives for `title` by [`ARTIST`].
    pub fn query(title: &str) -> String {
        track(title).search_query()
    }

    /// A config rooted at `downloads_root` with short delays.
    pub fn config(downloads_root: &Path) -> Config {
        let mut config = Config::default();
        config.downloads.root = downloads_root.to_path_buf();
        config.downloads.finalize_grace_ms = 20;
        config.retry.cooldown_ms = 1;
        config.proxies.file = None;
        config
    }

    /// A resolved collection of `n` fixture tracks.
    pub fn collection(title: &str, content_type: ContentType, n: usize) -> ResolvedCollection {
        ResolvedCollection {
            title: title.to_string(),
            cover: "https://i.scdn.co/image/cover".to_string(),
            content_type,
            tracks: tracks(n),
        }
    }
}
