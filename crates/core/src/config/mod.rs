use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for a presentation session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub autoplay: AutoplayConfig,
    pub ambient: AmbientConfig,
}

impl AppConfig {
    /// Loads a configuration from a JSON file. Missing fields keep their
    /// defaults, so an empty object is a valid file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Settings for asset classification and feed composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub pinned_count: usize,
    pub batch_size: usize,
    /// Identity substrings that select the pinned items, in display order.
    pub preferred_ids: Vec<String>,
    pub pinned_caption: String,
    pub feed_caption: String,
    /// Lower-case extensions (without the dot) classified as video.
    pub video_extensions: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            pinned_count: 2,
            batch_size: 4,
            preferred_ids: vec!["forever-1".to_string(), "forever-2".to_string()],
            pinned_caption: "Forever Us".to_string(),
            feed_caption: "Our Moments".to_string(),
            video_extensions: ["mp4", "webm", "mov", "m4v", "ogv"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Settings for visibility driven autoplay of feed tiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    pub visibility_threshold: f32,
    pub settle_delay_ms: u64,
    pub max_play_retries: u32,
    pub load_timeout_ms: u64,
}

impl AutoplayConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.6,
            settle_delay_ms: 100,
            max_play_retries: 1,
            load_timeout_ms: 5_000,
        }
    }
}

/// Settings for the background audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub volume: f32,
    pub looping: bool,
    /// Attempt playback as soon as the session starts.
    pub autostart: bool,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            volume: 0.15,
            looping: true,
            autostart: true,
        }
    }
}
