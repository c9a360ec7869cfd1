//! Spotify Web API resolver.
//!
//! Uses the refresh-token grant (no client secret) and caches the access
//! token until shortly before it expires. Album and playlist tracks are
//! paged through via each page's `next` link.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::config::CatalogConfig;
use super::types::{parse_link, ContentType, ResolvedCollection};
use super::{CatalogError, MetadataResolver};
use crate::track::TrackRequest;

/// Tokens are refreshed this long before their stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AlbumRef {
    #[serde(default)]
    images: Option<Vec<Image>>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<Artist>,
    #[serde(default)]
    album: Option<AlbumRef>,
}

#[derive(Debug, Deserialize)]
struct TracksRef {
    href: String,
}

#[derive(Debug, Deserialize)]
struct CollectionObject {
    name: String,
    #[serde(default)]
    images: Option<Vec<Image>>,
    tracks: TracksRef,
}

/// Playlist pages wrap each track in `track`; album pages do not.
#[derive(Debug, Deserialize)]
struct PageItem {
    #[serde(default)]
    track: Option<TrackObject>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    items: Vec<PageItem>,
    #[serde(default)]
    next: Option<String>,
}

fn join_artists(artists: &[Artist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_image(images: &Option<Vec<Image>>) -> Option<String> {
    images
        .as_ref()
        .and_then(|i| i.first())
        .map(|i| i.url.clone())
}

fn page_tracks(page: Page) -> Vec<TrackRequest> {
    page.items
        .into_iter()
        .filter_map(|item| {
            let (name, artists) = match item.track {
                Some(track) => (track.name, track.artists),
                None => (item.name, item.artists),
            };
            let name = name.filter(|n| !n.is_empty())?;
            Some(TrackRequest::new(name, join_artists(&artists)))
        })
        .collect()
}

/// Spotify Web API client implementing [`MetadataResolver`].
pub struct SpotifyResolver {
    client: Client,
    api_base: String,
    accounts_base: String,
    client_id: String,
    refresh_token: RwLock<String>,
    token: RwLock<Option<AccessToken>>,
}

impl SpotifyResolver {
    /// Create a new resolver.
    pub fn new(config: CatalogConfig) -> Result<Self, CatalogError> {
        if config.client_id.is_empty() || config.refresh_token.is_empty() {
            return Err(CatalogError::AuthFailed(
                "client_id and refresh_token are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            accounts_base: config.accounts_base.trim_end_matches('/').to_string(),
            client_id: config.client_id,
            refresh_token: RwLock::new(config.refresh_token),
            token: RwLock::new(None),
        })
    }

    /// Returns a valid access token, refreshing it if needed.
    async fn access_token(&self) -> Result<String, CatalogError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let mut cached = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let refresh_token = self.refresh_token.read().await.clone();
        let url = format!("{}/api/token", self.accounts_base);
        debug!("Refreshing catalog access token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::AuthFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Catalog token refresh failed: {} {}", status, body);
            return Err(CatalogError::AuthFailed(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            CatalogError::AuthFailed(format!("Failed to parse token response: {}", e))
        })?;

        if let Some(rotated) = token.refresh_token.filter(|t| !t.is_empty()) {
            *self.refresh_token.write().await = rotated;
        }

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(AccessToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T, CatalogError> {
        debug!("Catalog GET {}", url);
        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Drop the cached token so the next call refreshes.
            *self.token.write().await = None;
            return Err(CatalogError::AuthFailed("access token rejected".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl MetadataResolver for SpotifyResolver {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn resolve(&self, link: &str) -> Result<ResolvedCollection, CatalogError> {
        let link = parse_link(link)?;
        let token = self.access_token().await?;
        let url = format!(
            "{}/{}s/{}",
            self.api_base,
            link.content_type.as_str(),
            link.id
        );

        match link.content_type {
            ContentType::Track => {
                let track: TrackObject = self.get_json(&url, &token).await?;
                let cover = track
                    .album
                    .as_ref()
                    .and_then(|a| first_image(&a.images))
                    .unwrap_or_default();
                let title = track.name.unwrap_or_default();
                let artist = join_artists(&track.artists);
                Ok(ResolvedCollection {
                    tracks: vec![TrackRequest::new(title.clone(), artist)],
                    title,
                    cover,
                    content_type: ContentType::Track,
                })
            }
            ContentType::Album | ContentType::Playlist => {
                let collection: CollectionObject = self.get_json(&url, &token).await?;
                let mut tracks = Vec::new();
                let mut next = Some(collection.tracks.href.clone());
                while let Some(page_url) = next {
                    let page: Page = self.get_json(&page_url, &token).await?;
                    next = page.next.clone();
                    tracks.extend(page_tracks(page));
                }
                debug!(
                    "Resolved {} {} with {} tracks",
                    link.content_type,
                    link.id,
                    tracks.len()
                );
                Ok(ResolvedCollection {
                    cover: first_image(&collection.images).unwrap_or_default(),
                    title: collection.name,
                    content_type: link.content_type,
                    tracks,
                })
            }
        }
    }
}
