//! playback/engine.rs
//! Playback engine (audio output owner).
//!
//! Owns:
//! - the AudioOutput handle (rodio in production, fakes in tests)
//! - command loop + periodic position ticks
//!
//! Emits PlayerEvent back via a channel. No session imports.

use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use super::output::AudioOutput;
use super::{PlayerCommand, PlayerEvent};

const TICK_MS: u64 = 200;

pub struct PlaybackEngine<O: AudioOutput> {
    output: O,

    /// Generation of the currently bound stream, tagged onto every event.
    generation: u64,
    /// A source is bound and usable.
    loaded: bool,
    /// Last gain pushed by the session; re-applied to each new source.
    gain: f32,

    // Event channel
    event_tx: Sender<PlayerEvent>,
}

impl<O: AudioOutput> PlaybackEngine<O> {
    pub fn new(output: O, event_tx: Sender<PlayerEvent>) -> Self {
        Self {
            output,
            generation: 0,
            loaded: false,
            gain: 1.0,
            event_tx,
        }
    }

    pub fn run(&mut self, command_rx: Receiver<PlayerCommand>) {
        let tick = Duration::from_millis(TICK_MS);

        'running: loop {
            match command_rx.recv_timeout(tick) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break 'running;
                    }
                    while let Ok(cmd) = command_rx.try_recv() {
                        if self.handle_command(cmd) {
                            break 'running;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.tick();
        }

        self.output.stop();
    }

    /// Returns true when the engine should exit.
    fn handle_command(&mut self, cmd: PlayerCommand) -> bool {
        match cmd {
            PlayerCommand::LoadStream { url, generation } => {
                // The new load supersedes the old source immediately;
                // anything it still had to say carries a stale generation.
                self.generation = generation;
                self.output.stop();
                self.loaded = false;

                match self.output.load(&url) {
                    Ok(duration) => {
                        self.output.set_volume(self.gain);
                        self.loaded = true;
                        log::debug!("bound stream {url} (generation {generation})");
                        self.emit(PlayerEvent::MetadataReady {
                            generation,
                            duration,
                        });
                    }
                    Err(error) => {
                        log::debug!("load failed for {url}: {error}");
                        self.emit(PlayerEvent::Error { generation, error });
                    }
                }
            }
            PlayerCommand::Play => {
                if !self.loaded {
                    return false;
                }
                match self.output.play() {
                    Ok(()) => self.emit(PlayerEvent::Playing {
                        generation: self.generation,
                    }),
                    Err(error) => self.emit(PlayerEvent::Error {
                        generation: self.generation,
                        error,
                    }),
                }
            }
            PlayerCommand::Pause => {
                if self.loaded {
                    self.output.pause();
                    self.emit(PlayerEvent::Paused {
                        generation: self.generation,
                    });
                }
            }
            PlayerCommand::Seek(seconds) => {
                if self.loaded {
                    match self.output.seek(seconds) {
                        Ok(()) => self.emit(PlayerEvent::Position {
                            generation: self.generation,
                            seconds,
                        }),
                        Err(error) => self.emit(PlayerEvent::Error {
                            generation: self.generation,
                            error,
                        }),
                    }
                }
            }
            PlayerCommand::SetVolume(gain) => {
                self.gain = gain;
                self.output.set_volume(gain);
            }
            PlayerCommand::Shutdown => return true,
        }

        false
    }

    fn tick(&mut self) {
        if !self.loaded {
            return;
        }

        if self.output.is_playing() {
            self.emit(PlayerEvent::Position {
                generation: self.generation,
                seconds: self.output.position(),
            });
        }

        if self.output.finished() {
            log::debug!("stream ran dry (generation {})", self.generation);
            self.emit(PlayerEvent::Ended {
                generation: self.generation,
            });
            self.output.stop();
            self.loaded = false;
        }
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }
}
