//! Metadata lookup for music links.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use spotitools_core::ResolvedCollection;
use std::sync::Arc;
use tracing::warn;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

/// Every resolution failure is reported to clients with this one message.
const FETCH_FAILED: &str = "Fetch failed.";

#[derive(Debug, Deserialize)]
pub struct InfoBody {
    pub link: String,
}

/// Resolve a track, album or playlist link into its title, cover and tracks.
pub async fn resolve_info(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InfoBody>,
) -> Result<Json<ResolvedCollection>, ApiError> {
    let Some(resolver) = state.resolver() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Metadata lookup is not configured",
        ));
    };

    match resolver.resolve(&body.link).await {
        Ok(collection) => Ok(Json(collection)),
        Err(e) => {
            warn!("Failed to resolve {} via {}: {}", body.link, resolver.name(), e);
            Err(api_error(StatusCode::BAD_REQUEST, FETCH_FAILED))
        }
    }
}
