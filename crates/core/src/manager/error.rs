//! Error types for the job manager.

use std::path::PathBuf;
use thiserror::Error;

/// Errors when starting a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("No tracks to download")]
    EmptyTrackList,

    #[error("Failed to create job directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job manager is shutting down")]
    ShuttingDown,
}
