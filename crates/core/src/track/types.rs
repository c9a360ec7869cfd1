use serde::{Deserialize, Serialize};
use std::fmt;

use super::sanitize::sanitize_or;

/// Fallback stem for tracks whose rendered name sanitizes to nothing.
const UNTITLED: &str = "Untitled";

/// A single (title, artist) unit of work, as produced by metadata resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRequest {
    pub title: String,
    pub artist: String,
}

impl TrackRequest {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Query handed to the search-based fetch tool.
    pub fn search_query(&self) -> String {
        format!("{} - {} audio", self.artist, self.title)
    }

    /// Sanitized file stem for this track under the given naming pattern.
    pub fn file_stem(&self, pattern: &NamingPattern) -> String {
        sanitize_or(&pattern.render(self), UNTITLED)
    }
}

/// Target audio format for extracted tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Flac,
    M4a,
    Wav,
    Ogg,
}

impl AudioFormat {
    /// File extension, which is also the name the fetch tool expects.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }

    /// Parses a client-supplied format, coercing anything unknown to MP3.
    pub fn from_request(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("flac") => AudioFormat::Flac,
            Some("m4a") => AudioFormat::M4a,
            Some("wav") => AudioFormat::Wav,
            Some("ogg") => AudioFormat::Ogg,
            _ => AudioFormat::Mp3,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// User-supplied naming template.
///
/// `%t` expands to the track title and `%a` to the artist; every occurrence
/// is replaced. The rendered name is sanitized before it touches the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamingPattern(String);

impl NamingPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Builds a pattern from an optional request value, defaulting to `%t`.
    pub fn from_request(value: Option<&str>) -> Self {
        match value {
            Some(p) if !p.trim().is_empty() => Self::new(p),
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, track: &TrackRequest) -> String {
        self.0
            .replace("%t", &track.title)
            .replace("%a", &track.artist)
    }
}

impl Default for NamingPattern {
    fn default() -> Self {
        Self("%t".to_string())
    }
}
