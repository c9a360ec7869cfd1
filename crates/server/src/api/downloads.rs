//! Download job API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use spotitools_core::{
    AudioFormat, JobError, JobRequest, JobStatus, JobToken, NamingPattern, TrackRequest,
};
use std::sync::Arc;
use tracing::{error, info};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a download job
#[derive(Debug, Deserialize)]
pub struct StartDownloadBody {
    #[serde(default)]
    pub tracks: Vec<TrackRequest>,
    /// Target format; unknown values fall back to mp3
    pub format: Option<String>,
    /// Collection title, used to name the archive
    pub title: Option<String>,
    /// File naming template (`%t` title, `%a` artist)
    pub pattern: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDownloadResponse {
    pub success: bool,
    pub download_id: String,
    pub total: usize,
}

/// Request body for cancelling a job
#[derive(Debug, Deserialize)]
pub struct CancelDownloadBody {
    pub uuid: String,
}

#[derive(Debug, Serialize)]
pub struct CancelDownloadResponse {
    pub success: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a download job. Returns as soon as the job is registered.
pub async fn start_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartDownloadBody>,
) -> Result<Json<StartDownloadResponse>, ApiError> {
    let total = body.tracks.len();
    let request = JobRequest::new(body.tracks)
        .with_format(AudioFormat::from_request(body.format.as_deref()))
        .with_naming(NamingPattern::from_request(body.pattern.as_deref()))
        .with_title(body.title.unwrap_or_default());

    match state.manager().start_job(request).await {
        Ok(token) => Ok(Json(StartDownloadResponse {
            success: true,
            download_id: token.to_string(),
            total,
        })),
        Err(e @ JobError::EmptyTrackList) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
        Err(e @ JobError::ShuttingDown) => {
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
        }
        Err(e) => {
            error!("Failed to start job: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Cancel a running job. Unknown, malformed or finished ids report `success: false`.
pub async fn cancel_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CancelDownloadBody>,
) -> Json<CancelDownloadResponse> {
    let success = match JobToken::parse(&body.uuid) {
        Ok(token) => state.manager().cancel_job(&token).await,
        Err(_) => false,
    };
    if success {
        info!("Cancel requested for job {}", body.uuid);
    }
    Json(CancelDownloadResponse { success })
}

/// Current state of a job, or whether its files are still on disk.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<JobStatus> {
    match JobToken::parse(&id) {
        Ok(token) => Json(state.manager().status(&token).await),
        // Never a valid directory name, don't touch the filesystem.
        Err(_) => Json(JobStatus::inactive(false)),
    }
}
