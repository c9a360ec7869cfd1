//! Configuration for the fetch executor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the `yt-dlp` based fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Path to the fetch tool binary.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Value passed to `--audio-quality` ("0" is best).
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,

    /// Per-attempt deadline in seconds. Unset means the tool decides.
    #[serde(default)]
    pub attempt_timeout_secs: Option<u64>,

    /// Additional arguments inserted before the search target.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_audio_quality() -> String {
    "0".to_string()
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            audio_quality: default_audio_quality(),
            attempt_timeout_secs: None,
            extra_args: Vec::new(),
        }
    }
}
