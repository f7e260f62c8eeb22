//! error.rs
//! Error types for the playback core.
//!
//! Every variant ends up as display text in `PlaybackState::error`; none
//! of them abort an operation beyond leaving state untouched.

use thiserror::Error;

/// Failures the player can report.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlayerError {
    /// Stream URL missing, empty, or still the unset placeholder.
    #[error("stream URL is not configured")]
    StreamNotConfigured,

    /// The stream could not be fetched or its format not understood.
    #[error("failed to load stream: {0}")]
    Load(String),

    /// The output refused to start or continue playback.
    #[error("playback failed: {0}")]
    Playback(String),

    /// The bound source rejected a position change (live streams do).
    #[error("seek failed: {0}")]
    Seek(String),

    /// Settings file could not be read or written.
    #[error("settings error: {0}")]
    Settings(String),
}

/// Convenience Result alias for this crate.
pub type Result<T> = std::result::Result<T, PlayerError>;
