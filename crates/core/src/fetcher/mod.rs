//! Fetch executor: one invocation of the external audio-fetch tool per attempt.
//!
//! The [`Fetcher`] trait is the seam between the worker pool and the tool.
//! [`YtDlpFetcher`] drives `yt-dlp`; tests use the scripted fetcher from
//! [`crate::testing`].
//!
//! # Example
//!
//! ```ignore
//! use spotitools_core::fetcher::{FetchRequest, Fetcher, YtDlpFetcher};
//! use spotitools_core::job::ProcessRegistry;
//!
//! let fetcher = YtDlpFetcher::with_defaults();
//! fetcher.validate().await?;
//!
//! let registry = ProcessRegistry::new();
//! let request = FetchRequest {
//!     query: "Radiohead - Karma Police audio".to_string(),
//!     output_path: PathBuf::from("/tmp/job/Karma Police.mp3"),
//!     format: AudioFormat::Mp3,
//!     proxy: None,
//! };
//! let path = fetcher.fetch(&request, &registry).await?;
//! ```

mod config;
mod error;
mod traits;
mod ytdlp;

pub use config::FetcherConfig;
pub use error::FetchError;
pub use traits::{FetchRequest, Fetcher};
pub use ytdlp::YtDlpFetcher;
