//! types.rs
//! Core data types shared between the session and its embedder.
//!
//! Rule of thumb:
//! - These structs should be “boring bags of data”
//! - No audio code
//! - No channel code
//!
//! Why?
//! - Easy to display in a UI
//! - Easy to snapshot and send to subscribers
//! - Easy to unit test
//!
//! `PlaybackState` is everything an embedder needs to render the player.

/// One snapshot of the player.
///
/// We use `Option` for values that may legitimately be unknown:
/// - a live stream usually never reports a duration
/// - no stream is bound until the first successful `load_stream`
/// - `error` is advisory text, present only after a failure
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// True between a confirmed play and the next pause/end.
    pub is_playing: bool,

    /// True from an accepted `load_stream` until the stream's metadata
    /// arrives (or loading fails).
    pub is_loading: bool,

    /// Last volume the caller chose. Contract: `0.0..=1.0`, not clamped
    /// here.
    pub volume: f32,

    /// Muted means the effective output gain is 0, whatever `volume` says.
    pub is_muted: bool,

    /// Playback position in seconds.
    pub current_time: f64,

    /// Stream duration in seconds, when the container reports one.
    pub duration: Option<f64>,

    /// The currently bound stream URL. At most one at a time.
    pub stream_url: Option<String>,

    /// Human-readable message from the last failure. Cleared on every
    /// accepted load and every successful play.
    pub error: Option<String>,
}

impl PlaybackState {
    /// The gain that should actually reach the audio output.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted { 0.0 } else { self.volume }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_loading: false,
            volume: 1.0,
            is_muted: false,
            current_time: 0.0,
            duration: None,
            stream_url: None,
            error: None,
        }
    }
}
