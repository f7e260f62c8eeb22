//! onair — playback core for a live radio stream.
//!
//! This crate is the state-ful slice of a station player: one audio
//! output handle, one store of truth about it, and nothing visual.
//! A UI (or anything else) embeds it like this:
//!
//! - [`PlayerSession`] = the store. Holds the current [`PlaybackState`],
//!   validates every user intent, and is the ONLY thing that mutates state.
//! - [`playback::PlayerController`] = a cheap cloneable handle that sends
//!   commands to the engine thread.
//! - The engine thread owns the native audio output and answers with
//!   [`playback::PlayerEvent`]s.
//!
//! The loop the embedder drives forever:
//! **op call -> command -> engine touches audio -> event -> `drain_events()`
//! applies it -> subscribers see a fresh snapshot**
//!
//! Nothing in here blocks the caller: ops return immediately, outcomes
//! arrive as events. Failures are advisory strings in
//! [`PlaybackState::error`], never hard errors — the embedder decides
//! whether to retry.

pub mod config;
pub mod error;
pub mod playback;
pub mod session;
pub mod settings;
pub mod types;

pub use config::StationConfig;
pub use error::PlayerError;
pub use session::PlayerSession;
pub use types::PlaybackState;
