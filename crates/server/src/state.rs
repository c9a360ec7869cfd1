use std::sync::Arc;

use spotitools_core::{Config, JobManager, MetadataResolver, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    manager: JobManager,
    resolver: Option<Arc<dyn MetadataResolver>>,
}

impl AppState {
    pub fn new(
        config: Config,
        manager: JobManager,
        resolver: Option<Arc<dyn MetadataResolver>>,
    ) -> Self {
        Self {
            config,
            manager,
            resolver,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn manager(&self) -> &JobManager {
        &self.manager
    }

    /// Metadata resolver, if a catalog is configured.
    pub fn resolver(&self) -> Option<&Arc<dyn MetadataResolver>> {
        self.resolver.as_ref()
    }
}
