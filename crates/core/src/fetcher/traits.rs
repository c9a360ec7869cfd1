//! Trait definitions for the fetch executor.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::FetchError;
use crate::job::ProcessRegistry;
use crate::track::AudioFormat;

/// One fetch attempt for one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Search query; the first hit is used.
    pub query: String,
    /// Where the extracted audio must end up, extension included.
    pub output_path: PathBuf,
    pub format: AudioFormat,
    /// Upstream proxy for this attempt.
    pub proxy: Option<String>,
}

/// Something that can turn a search query into an audio file on disk.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Runs one attempt.
    ///
    /// Any spawned process must be registered with `processes` before the
    /// call waits on it, and must be terminated if its kill switch trips.
    /// Resolves to the output path only if the file exists afterwards.
    async fn fetch(
        &self,
        request: &FetchRequest,
        processes: &ProcessRegistry,
    ) -> Result<PathBuf, FetchError>;

    /// Checks that the fetcher is usable.
    async fn validate(&self) -> Result<(), FetchError>;
}
