//! Catalog link and collection types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CatalogError;
use crate::track::TrackRequest;

/// Kind of catalog entity a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Track,
    Album,
    Playlist,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Track => "track",
            ContentType::Album => "album",
            ContentType::Playlist => "playlist",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "track" => Some(ContentType::Track),
            "album" => Some(ContentType::Album),
            "playlist" => Some(ContentType::Playlist),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed catalog link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLink {
    pub content_type: ContentType,
    pub id: String,
}

/// Parses `https://open.spotify.com/<...>/{track|album|playlist}/<id>`.
///
/// The first `track`, `album` or `playlist` path segment decides the type
/// and the segment after it is the id. Query strings are ignored.
pub fn parse_link(link: &str) -> Result<CatalogLink, CatalogError> {
    let invalid = || CatalogError::InvalidLink(link.to_string());

    let url = reqwest::Url::parse(link.trim()).map_err(|_| invalid())?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let (index, content_type) = segments
        .iter()
        .enumerate()
        .find_map(|(i, s)| ContentType::from_segment(s).map(|t| (i, t)))
        .ok_or_else(invalid)?;
    let id = segments.get(index + 1).ok_or_else(invalid)?;

    Ok(CatalogLink {
        content_type,
        id: id.to_string(),
    })
}

/// A resolved track, album or playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCollection {
    pub title: String,
    /// Cover image URL, empty when the catalog has none.
    pub cover: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub tracks: Vec<TrackRequest>,
}
