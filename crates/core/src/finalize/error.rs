//! Error types for the finalizer.

use thiserror::Error;

/// Errors while writing a job archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The blocking archive task panicked or was cancelled.
    #[error("Archive task failed: {0}")]
    Task(String),
}
