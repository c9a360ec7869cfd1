//! Catalog client configuration.

use serde::{Deserialize, Serialize};

/// Spotify Web API credentials and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Application client id.
    pub client_id: String,
    /// Long-lived refresh token. Rotated tokens replace it in memory.
    pub refresh_token: String,
    /// Web API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Accounts service base URL (token endpoint).
    #[serde(default = "default_accounts_base")]
    pub accounts_base: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_accounts_base() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            refresh_token: String::new(),
            api_base: default_api_base(),
            accounts_base: default_accounts_base(),
            timeout_secs: default_timeout(),
        }
    }
}
