use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{downloads, handlers, info, middleware::metrics_middleware, progress};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Metadata
        .route("/info", post(info::resolve_info))
        // Download jobs
        .route("/downloads", post(downloads::start_download))
        .route("/downloads/cancel", post(downloads::cancel_download))
        .route("/downloads/{id}/status", get(downloads::get_status))
        .route("/downloads/{id}/progress", get(progress::stream_progress));

    // Finished files are served straight from the download root
    let downloads = &state.config().downloads;
    let serve_dir = ServeDir::new(&downloads.root);
    let prefix = downloads.url_prefix.trim_end_matches('/');

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics));
    let router = if prefix.is_empty() {
        router.fallback_service(serve_dir)
    } else {
        router.nest_service(prefix, serve_dir)
    };

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
