//! Job state records and status views.

use serde::{Deserialize, Serialize};

/// Snapshot of a job as seen by subscribers and status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    /// 0-100. Non-decreasing until a terminal state is written.
    pub progress: u8,
    /// Human readable status line.
    pub message: String,
    /// Download URL of the terminal artifact, empty until done.
    #[serde(rename = "url")]
    pub result_url: String,
    pub done: bool,
    pub cancelled: bool,
    pub is_archive: bool,
}

impl JobState {
    /// State of a freshly created job.
    pub fn starting() -> Self {
        Self {
            progress: 0,
            message: "Starting...".to_string(),
            result_url: String::new(),
            done: false,
            cancelled: false,
            is_archive: false,
        }
    }
}

/// Replacement values for [`JobState`], applied atomically by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpdate {
    pub message: String,
    pub percent: u8,
    pub url: Option<String>,
    pub done: bool,
    pub is_archive: bool,
}

impl StateUpdate {
    /// In-flight progress report.
    pub fn progress(message: impl Into<String>, percent: u8) -> Self {
        Self {
            message: message.into(),
            percent: percent.min(100),
            url: None,
            done: false,
            is_archive: false,
        }
    }

    /// Terminal success pointing at the job's artifact.
    pub fn completed(url: impl Into<String>, is_archive: bool) -> Self {
        Self {
            message: "Done".to_string(),
            percent: 100,
            url: Some(url.into()),
            done: true,
            is_archive,
        }
    }

    /// Terminal failure. Progress is reset to 0.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            percent: 0,
            url: None,
            done: true,
            is_archive: false,
        }
    }

    /// Applies this update on top of `current`.
    ///
    /// In-flight updates never lower the progress value; workers read the
    /// completion counter independently and may report out of order.
    pub(crate) fn apply(self, current: &JobState) -> JobState {
        let progress = if self.done {
            self.percent
        } else {
            self.percent.max(current.progress)
        };
        JobState {
            progress,
            message: self.message,
            result_url: self.url.unwrap_or_default(),
            done: self.done,
            cancelled: current.cancelled,
            is_archive: self.is_archive,
        }
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobStatus {
    /// The job has a live record.
    Active {
        active: bool,
        #[serde(flatten)]
        state: JobState,
    },
    /// No record; reports whether the job's directory is still on disk.
    Inactive {
        active: bool,
        #[serde(rename = "exists")]
        exists_on_disk: bool,
    },
}

impl JobStatus {
    pub fn active(state: JobState) -> Self {
        Self::Active {
            active: true,
            state,
        }
    }

    pub fn inactive(exists_on_disk: bool) -> Self {
        Self::Inactive {
            active: false,
            exists_on_disk,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    pub fn state(&self) -> Option<&JobState> {
        match self {
            Self::Active { state, .. } => Some(state),
            Self::Inactive { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_camel_case() {
        let state = StateUpdate::completed("/downloads/x/a.zip", true).apply(&JobState::starting());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["progress"], 100);
        assert_eq!(json["message"], "Done");
        assert_eq!(json["url"], "/downloads/x/a.zip");
        assert_eq!(json["done"], true);
        assert_eq!(json["isArchive"], true);
        assert_eq!(json["cancelled"], false);
    }

    #[test]
    fn test_progress_never_decreases_in_flight() {
        let current = StateUpdate::progress("Downloading: a", 60).apply(&JobState::starting());
        let next = StateUpdate::progress("Downloading: b", 40).apply(&current);
        assert_eq!(next.progress, 60);
        assert_eq!(next.message, "Downloading: b");
    }

    #[test]
    fn test_terminal_failure_resets_progress() {
        let current = StateUpdate::progress("Downloading: a", 60).apply(&JobState::starting());
        let failed = StateUpdate::failed("Failed: No files downloaded").apply(&current);
        assert_eq!(failed.progress, 0);
        assert!(failed.done);
        assert!(failed.result_url.is_empty());
    }

    #[test]
    fn test_percent_is_capped() {
        assert_eq!(StateUpdate::progress("x", 250).percent, 100);
    }

    #[test]
    fn test_status_active_serialization() {
        let status = JobStatus::active(JobState::starting());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["active"], true);
        assert_eq!(json["message"], "Starting...");
        assert_eq!(json["progress"], 0);
    }

    #[test]
    fn test_status_inactive_serialization() {
        let json = serde_json::to_value(JobStatus::inactive(true)).unwrap();
        assert_eq!(json, serde_json::json!({"active": false, "exists": true}));
    }
}
