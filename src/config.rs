//! config.rs
//! Where the stream URL comes from.
//!
//! The station's live feed URL is deployment config, not code. It arrives
//! either from the environment (`ONAIR_STREAM_URL`) or directly from the
//! embedder. Either way the same validation applies: an empty value and
//! the scaffolding placeholder both mean "nobody configured this yet",
//! which is an advisory error, not a crash.

use crate::error::{PlayerError, Result};

/// Environment variable holding the live stream URL.
pub const STREAM_URL_ENV: &str = "ONAIR_STREAM_URL";

/// Placeholder value left behind by project scaffolding. Treated the same
/// as an empty URL.
pub const STREAM_URL_PLACEHOLDER: &str = "/audio/live.mp3";

/// True when `url` does not name a real stream: empty or the placeholder.
pub(crate) fn is_unset_stream_url(url: &str) -> bool {
    url.is_empty() || url == STREAM_URL_PLACEHOLDER
}

/// Station-level configuration. Currently just the feed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub stream_url: String,
}

impl StationConfig {
    /// Validate an explicit URL.
    pub fn new(stream_url: impl Into<String>) -> Result<Self> {
        let stream_url = stream_url.into();
        if is_unset_stream_url(stream_url.trim()) {
            return Err(PlayerError::StreamNotConfigured);
        }
        Ok(Self { stream_url })
    }

    /// Read the stream URL from `ONAIR_STREAM_URL`.
    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var(STREAM_URL_ENV).unwrap_or_default())
    }
}
