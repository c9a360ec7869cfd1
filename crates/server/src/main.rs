use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotitools_core::{
    load_config, validate_config, Fetcher, JobManager, MetadataResolver, ProxyList,
    SpotifyResolver, YtDlpFetcher,
};
use spotitools_server::api::create_router;
use spotitools_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SPOTITOOLS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        "Configuration loaded successfully (spotitools {}, config {})",
        VERSION,
        &config_hash[..16]
    );
    info!("Download root: {:?}", config.downloads.root);

    tokio::fs::create_dir_all(&config.downloads.root)
        .await
        .with_context(|| format!("Failed to create download root {:?}", config.downloads.root))?;

    // Proxy list (optional)
    let proxies = match &config.proxies.file {
        Some(path) => ProxyList::load(path)
            .await
            .with_context(|| format!("Failed to read proxy list {:?}", path))?,
        None => {
            info!("No proxy list configured");
            ProxyList::empty()
        }
    };

    // Fetch tool
    let fetcher = YtDlpFetcher::new(config.fetcher.clone());
    match fetcher.validate().await {
        Ok(()) => info!("Using fetcher: {}", fetcher.name()),
        Err(e) => warn!("Fetcher {} is not usable yet: {}", fetcher.name(), e),
    }

    // Metadata resolver if configured
    let resolver: Option<Arc<dyn MetadataResolver>> = match &config.catalog {
        Some(catalog_config) => match SpotifyResolver::new(catalog_config.clone()) {
            Ok(resolver) => {
                info!("Initializing Spotify metadata resolver");
                Some(Arc::new(resolver))
            }
            Err(e) => {
                error!("Failed to create metadata resolver: {}", e);
                None
            }
        },
        None => {
            info!("No catalog configured, /api/v1/info is disabled");
            None
        }
    };

    // Job manager and retention sweep
    let manager = JobManager::new(&config, Arc::new(fetcher), proxies);
    let sweep_handle = manager.spawn_retention_sweep();
    info!(
        "Retention sweep every {}s, keeping downloads for {}h",
        config.downloads.sweep_interval_secs, config.downloads.retention_hours
    );

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), manager.clone(), resolver));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Jobs are cancelled before connections drain so open progress
    // streams end and the server can stop.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(manager))
        .await
        .context("Server error")?;

    if let Err(e) = sweep_handle.await {
        error!("Retention sweep task failed: {}", e);
    }
    info!("Server stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then stop all jobs.
async fn shutdown_signal(manager: JobManager) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Server shutting down...");
    manager.shutdown().await;
    info!("All jobs stopped");
}
