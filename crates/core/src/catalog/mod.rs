//! Metadata resolution: catalog link to a titled list of tracks.
//!
//! The [`MetadataResolver`] trait is what the HTTP layer talks to.
//! [`SpotifyResolver`] implements it against the Spotify Web API.

mod config;
mod spotify;
mod types;

pub use config::CatalogConfig;
pub use spotify::SpotifyResolver;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from metadata resolution.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The link does not point at a track, album or playlist.
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// Access token could not be obtained.
    #[error("Catalog authentication failed: {0}")]
    AuthFailed(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

/// Resolves catalog links into track lists.
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Returns the name of this resolver implementation.
    fn name(&self) -> &str;

    /// Resolves `link` into its title, cover and tracks.
    async fn resolve(&self, link: &str) -> Result<ResolvedCollection, CatalogError>;
}
