//! Error types for the fetch executor.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetch tool binary could not be found.
    #[error("Fetch tool not found at path: {path}")]
    BinaryNotFound { path: PathBuf },

    /// The tool exited with a non-zero status.
    #[error("Fetch tool exited with code {code:?}")]
    ExitedWithFailure {
        code: Option<i32>,
        stderr: Option<String>,
    },

    /// The tool exited cleanly but the expected file is not on disk.
    #[error("Output file not created: {path}")]
    OutputMissing { path: PathBuf },

    /// The process was killed because its job was cancelled.
    #[error("Fetch killed")]
    Killed,

    /// The attempt exceeded its deadline.
    #[error("Fetch timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error while spawning or waiting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn exited(code: Option<i32>, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self::ExitedWithFailure {
            code,
            stderr: if stderr.trim().is_empty() {
                None
            } else {
                Some(stderr)
            },
        }
    }

    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Killed | Self::BinaryNotFound { .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BinaryNotFound { .. } => "binary_not_found",
            Self::ExitedWithFailure { .. } => "exit_failure",
            Self::OutputMissing { .. } => "output_missing",
            Self::Killed => "killed",
            Self::Timeout { .. } => "timeout",
            Self::Io(_) => "io",
        }
    }
}
