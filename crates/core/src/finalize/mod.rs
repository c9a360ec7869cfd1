//! Turns a job's output directory into its terminal artifact.
//!
//! After the pool returns (and the job was not cancelled) the finalizer
//! looks at the target-format files on disk:
//! - none: terminal failure, no artifact
//! - one: the file itself is the artifact
//! - several: they are zipped, the originals deleted, the zip is the artifact

mod archive;
mod error;

pub use archive::{create_archive, list_matching_files};
pub use error::ArchiveError;

use std::path::Path;

use tracing::{error, info, warn};

use crate::job::{JobStore, JobToken, StateUpdate};
use crate::track::{sanitize_or, AudioFormat};

pub const NO_FILES_MESSAGE: &str = "Failed: No files downloaded";
pub const ARCHIVE_FAILED_MESSAGE: &str = "Failed: Could not create archive";
pub const LISTING_FAILED_MESSAGE: &str = "Failed: Could not read downloads";
pub const ARCHIVING_MESSAGE: &str = "Archiving...";

/// Progress shown while the archive is written.
const ARCHIVING_PERCENT: u8 = 99;

/// Archive stem when the collection title sanitizes to nothing.
const DEFAULT_ARCHIVE_STEM: &str = "Playlist";

/// What the finalizer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Single { url: String },
    Archive { url: String, entries: usize },
    Empty,
    Failed { message: String },
}

impl FinalizeOutcome {
    /// Metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Single { .. } => "single",
            Self::Archive { .. } => "archive",
            Self::Empty => "empty",
            Self::Failed { .. } => "failed",
        }
    }

    /// The terminal state for this outcome.
    pub fn terminal_state(&self) -> StateUpdate {
        match self {
            Self::Single { url } => StateUpdate::completed(url.clone(), false),
            Self::Archive { url, .. } => StateUpdate::completed(url.clone(), true),
            Self::Empty => StateUpdate::failed(NO_FILES_MESSAGE),
            Self::Failed { message } => StateUpdate::failed(message.clone()),
        }
    }
}

/// Builds the terminal artifact and writes the terminal job state.
#[derive(Debug, Clone)]
pub struct Finalizer {
    url_prefix: String,
}

impl Finalizer {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_string();
        Self { url_prefix }
    }

    /// Public URL of `file_name` inside the job's directory.
    pub fn file_url(&self, token: &JobToken, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url_prefix,
            token,
            urlencoding::encode(file_name)
        )
    }

    /// File name of the archive for a collection titled `title`.
    pub fn archive_name(title: &str) -> String {
        format!("{}.zip", sanitize_or(title, DEFAULT_ARCHIVE_STEM))
    }

    /// Inspects `dir`, produces the artifact and reports the terminal state.
    pub async fn finalize(
        &self,
        store: &JobStore,
        token: &JobToken,
        dir: &Path,
        format: AudioFormat,
        title: &str,
    ) -> FinalizeOutcome {
        let outcome = self.build(store, token, dir, format, title).await;
        store.update(token, outcome.terminal_state()).await;
        outcome
    }

    async fn build(
        &self,
        store: &JobStore,
        token: &JobToken,
        dir: &Path,
        format: AudioFormat,
        title: &str,
    ) -> FinalizeOutcome {
        let listing = list_matching_files(dir.to_path_buf(), format.extension().to_string()).await;
        let files = match listing {
            Ok(files) => files,
            Err(e) => {
                error!("Failed to list {:?} for job {}: {}", dir, token, e);
                return FinalizeOutcome::Failed {
                    message: LISTING_FAILED_MESSAGE.to_string(),
                };
            }
        };

        match files.as_slice() {
            [] => {
                warn!("Job {} produced no files", token);
                FinalizeOutcome::Empty
            }
            [single] => {
                let name = single
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                info!("Job {} finished with single file {:?}", token, name);
                FinalizeOutcome::Single {
                    url: self.file_url(token, &name),
                }
            }
            _ => {
                store
                    .update(
                        token,
                        StateUpdate::progress(ARCHIVING_MESSAGE, ARCHIVING_PERCENT),
                    )
                    .await;

                let archive_name = Self::archive_name(title);
                let dest = dir.join(&archive_name);
                let archived = match create_archive(
                    dir.to_path_buf(),
                    dest,
                    format.extension().to_string(),
                )
                .await
                {
                    Ok(archived) => archived,
                    Err(e) => {
                        error!("Failed to archive job {}: {}", token, e);
                        return FinalizeOutcome::Failed {
                            message: ARCHIVE_FAILED_MESSAGE.to_string(),
                        };
                    }
                };

                for path in &archived {
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        warn!("Failed to remove {:?} after archiving: {}", path, e);
                    }
                }

                info!(
                    "Job {} finished with archive {:?} ({} files)",
                    token,
                    archive_name,
                    archived.len()
                );
                FinalizeOutcome::Archive {
                    url: self.file_url(token, &archive_name),
                    entries: archived.len(),
                }
            }
        }
    }
}
