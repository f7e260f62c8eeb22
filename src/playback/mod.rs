//! playback/mod.rs
//! onair playback module: commands in, events out.
//!
//! The engine runs on its own thread and owns the native audio output.
//! Everything it is told arrives as a `PlayerCommand`; everything it
//! learns goes back as a `PlayerEvent`. The session on the other side of
//! the channels is the only consumer.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

mod engine;
mod output;
mod stream;

pub use engine::PlaybackEngine;
pub use output::{AudioOutput, RodioOutput};

use crate::error::PlayerError;

#[derive(Clone)]
pub struct PlayerController {
    command_tx: Sender<PlayerCommand>,
}

impl PlayerController {
    /// Wrap a raw command sender. Useful for embedders running their own
    /// engine loop.
    pub fn new(command_tx: Sender<PlayerCommand>) -> Self {
        Self { command_tx }
    }

    /// Best-effort send. If the engine died, the command is dropped.
    pub fn send(&self, cmd: PlayerCommand) {
        let _ = self.command_tx.send(cmd);
    }
}

#[derive(Debug)]
pub enum PlayerCommand {
    /// Bind a new stream, superseding whatever was bound before.
    LoadStream { url: String, generation: u64 },
    Play,
    Pause,
    Seek(f64),      // seconds
    SetVolume(f32), // effective gain, 0.0..=1.0
    Shutdown,
}

/// Events the engine reports back.
///
/// Every event carries the generation of the load it belongs to, so the
/// session can drop leftovers from a superseded stream instead of letting
/// them overwrite newer state.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// The stream is bound and probed; duration is known if the
    /// container reports one.
    MetadataReady {
        generation: u64,
        duration: Option<f64>,
    },
    /// Playback actually started.
    Playing { generation: u64 },
    Paused { generation: u64 },
    Position { generation: u64, seconds: f64 },
    /// The bound source ran dry (stream ended or connection dropped).
    Ended { generation: u64 },
    Error {
        generation: u64,
        error: PlayerError,
    },
}

/// Spawns the playback thread and returns:
/// - `PlayerController` (store in the session)
/// - `Receiver<PlayerEvent>` (drained from the embedder's loop)
pub fn start_playback() -> (PlayerController, Receiver<PlayerEvent>) {
    let (command_tx, command_rx) = mpsc::channel::<PlayerCommand>();
    let (event_tx, event_rx) = mpsc::channel::<PlayerEvent>();

    thread::spawn(move || {
        // The output stream has to live on the thread that keeps it.
        let output = match RodioOutput::open() {
            Ok(output) => output,
            Err(error) => {
                let _ = event_tx.send(PlayerEvent::Error {
                    generation: 0,
                    error,
                });
                return;
            }
        };

        PlaybackEngine::new(output, event_tx).run(command_rx);
    });

    (PlayerController { command_tx }, event_rx)
}
