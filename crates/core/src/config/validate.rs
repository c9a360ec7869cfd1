use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Pool sizing inputs are non-zero
/// - At least one fetch attempt per track
/// - Download URL prefix is absolute
/// - Catalog credentials are present when the catalog is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.pool.workers_per_core == 0 {
        return Err(ConfigError::ValidationError(
            "pool.workers_per_core must be at least 1".to_string(),
        ));
    }

    if config.pool.memory_per_worker_mb == 0 {
        return Err(ConfigError::ValidationError(
            "pool.memory_per_worker_mb must be at least 1".to_string(),
        ));
    }

    if config.pool.max_workers == Some(0) {
        return Err(ConfigError::ValidationError(
            "pool.max_workers cannot be 0".to_string(),
        ));
    }

    if config.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts must be at least 1".to_string(),
        ));
    }

    if !config.downloads.url_prefix.starts_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "downloads.url_prefix must start with '/': {}",
            config.downloads.url_prefix
        )));
    }

    if config.downloads.retention_hours == 0 {
        return Err(ConfigError::ValidationError(
            "downloads.retention_hours cannot be 0".to_string(),
        ));
    }

    if let Some(catalog) = &config.catalog {
        if catalog.client_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.client_id is required".to_string(),
            ));
        }
        if catalog.refresh_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog.refresh_token is required".to_string(),
            ));
        }
    }

    Ok(())
}
