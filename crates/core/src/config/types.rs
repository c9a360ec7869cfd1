use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::catalog::CatalogConfig;
use crate::fetcher::FetcherConfig;
use crate::pool::{PoolConfig, RetryConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub proxies: ProxyConfig,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    10000
}

/// Output directory layout and retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// Directory holding one sub-directory per job.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// URL prefix under which `root` is served.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Job directories older than this are removed by the sweep.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// How often the retention sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Delay between the terminal state and closing the subscriber.
    #[serde(default = "default_finalize_grace")]
    pub finalize_grace_ms: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from("public/downloads")
}

fn default_url_prefix() -> String {
    "/downloads".to_string()
}

fn default_retention_hours() -> u64 {
    24
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

fn default_finalize_grace() -> u64 {
    1000
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            url_prefix: default_url_prefix(),
            retention_hours: default_retention_hours(),
            sweep_interval_secs: default_sweep_interval(),
            finalize_grace_ms: default_finalize_grace(),
        }
    }
}

/// Upstream proxy list configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// File with one proxy endpoint per line. A missing file means no proxies.
    #[serde(default = "default_proxy_file")]
    pub file: Option<PathBuf>,
}

fn default_proxy_file() -> Option<PathBuf> {
    Some(PathBuf::from("proxies.txt"))
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            file: default_proxy_file(),
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub downloads: DownloadsConfig,
    pub pool: PoolConfig,
    pub retry: RetryConfig,
    pub fetcher: FetcherConfig,
    pub proxies: ProxyConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<SanitizedCatalogConfig>,
}

/// Sanitized catalog config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub api_base: String,
    pub accounts_base: String,
    pub client_id_configured: bool,
    pub refresh_token_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            downloads: config.downloads.clone(),
            pool: config.pool.clone(),
            retry: config.retry.clone(),
            fetcher: config.fetcher.clone(),
            proxies: config.proxies.clone(),
            catalog: config.catalog.as_ref().map(|c| SanitizedCatalogConfig {
                api_base: c.api_base.clone(),
                accounts_base: c.accounts_base.clone(),
                client_id_configured: !c.client_id.is_empty(),
                refresh_token_configured: !c.refresh_token.is_empty(),
                timeout_secs: c.timeout_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[downloads]
root = "/tmp/dl"
url_prefix = "/files"
retention_hours = 6

[pool]
workers_per_core = 4
memory_per_worker_mb = 200
max_workers = 12

[retry]
max_attempts = 3
cooldown_ms = 500

[fetcher]
binary = "/usr/local/bin/yt-dlp"

[proxies]
file = "/etc/spotitools/proxies.txt"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.downloads.url_prefix, "/files");
        assert_eq!(config.downloads.retention_hours, 6);
        assert_eq!(config.downloads.sweep_interval_secs, 3600);
        assert_eq!(config.pool.workers_per_core, 4);
        assert_eq!(config.pool.max_workers, Some(12));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.cooldown_ms, 500);
        assert_eq!(
            config.fetcher.binary.to_str().unwrap(),
            "/usr/local/bin/yt-dlp"
        );
        assert_eq!(
            config.proxies.file.as_deref().and_then(|p| p.to_str()),
            Some("/etc/spotitools/proxies.txt")
        );
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.downloads.root.to_str().unwrap(), "public/downloads");
        assert_eq!(config.downloads.retention_hours, 24);
        assert_eq!(config.downloads.finalize_grace_ms, 1000);
        assert_eq!(config.pool.workers_per_core, 2);
        assert_eq!(config.pool.memory_per_worker_mb, 150);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.cooldown_ms, 2000);
        assert_eq!(
            config.proxies.file.as_deref().and_then(|p| p.to_str()),
            Some("proxies.txt")
        );
    }

    #[test]
    fn test_sanitized_config_hides_credentials() {
        let toml = r#"
[catalog]
client_id = "client-123"
refresh_token = "very-secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let catalog = sanitized.catalog.as_ref().unwrap();
        assert!(catalog.client_id_configured);
        assert!(catalog.refresh_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(!json.contains("client-123"));
    }

    #[test]
    fn test_sanitized_config_without_catalog() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(sanitized.catalog.is_none());
        assert_eq!(sanitized.server.port, 10000);
    }
}
