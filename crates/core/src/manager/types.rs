//! Job submission types.

use crate::track::{AudioFormat, NamingPattern, TrackRequest};

/// A resolved track list plus how to name and package the results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub tracks: Vec<TrackRequest>,
    pub format: AudioFormat,
    pub naming: NamingPattern,
    /// Collection title, used for the archive name.
    pub title: String,
}

impl JobRequest {
    pub fn new(tracks: Vec<TrackRequest>) -> Self {
        Self {
            tracks,
            format: AudioFormat::default(),
            naming: NamingPattern::default(),
            title: String::new(),
        }
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_naming(mut self, naming: NamingPattern) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
