//! session.rs
//! Session-engine bridge: the one store of truth about playback.
//!
//! Design goals:
//! - Embedders never touch rodio/symphonia directly.
//! - All IO / timing is driven by the engine + `drain_events` polling.
//! - Ops apply what they can immediately (pause, volume, seek position)
//!   and leave the rest to engine events; stale events from a superseded
//!   load are dropped by generation.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::config::is_unset_stream_url;
use crate::error::PlayerError;
use crate::playback::{PlayerCommand, PlayerController, PlayerEvent, start_playback};
use crate::settings::PlayerSettings;
use crate::types::PlaybackState;

/// One playback session: the state store plus its engine handles.
///
/// Not `Sync` on purpose — everything mutates on the embedder's thread,
/// either in a direct op call or in [`PlayerSession::drain_events`].
pub struct PlayerSession {
    state: PlaybackState,
    controller: PlayerController,
    events: Receiver<PlayerEvent>,

    /// Tag of the most recent accepted load; only events carrying it
    /// may touch the state.
    generation: u64,

    subscribers: Vec<Sender<PlaybackState>>,

    /// Where the volume is persisted. `None` = nothing persisted.
    settings_dir: Option<PathBuf>,
}

impl PlayerSession {
    /// Spawn the rodio-backed engine and restore the persisted volume.
    pub fn start(settings_dir: Option<PathBuf>) -> Self {
        let (controller, events) = start_playback();
        Self::with_engine(controller, events, settings_dir)
    }

    /// Wrap an already-running engine. This is the injection seam: tests
    /// and embedders with their own output hand in the channel pair.
    pub fn with_engine(
        controller: PlayerController,
        events: Receiver<PlayerEvent>,
        settings_dir: Option<PathBuf>,
    ) -> Self {
        let mut session = Self {
            state: PlaybackState::default(),
            controller,
            events,
            generation: 0,
            subscribers: Vec::new(),
            settings_dir,
        };

        if let Some(dir) = session.settings_dir.clone() {
            match PlayerSettings::load(&dir) {
                // Going through set_volume keeps the mute-on-zero rule
                // and pushes the gain to the engine.
                Ok(saved) => session.set_volume(saved.volume),
                Err(e) => log::warn!("ignoring saved settings: {e}"),
            }
        }

        session
    }

    /// Read-only view of the current state.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Subscribe to state changes. The current snapshot is delivered
    /// immediately, then one snapshot per change. A receiver that goes
    /// away is silently forgotten.
    pub fn subscribe(&mut self) -> Receiver<PlaybackState> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.state.clone());
        self.subscribers.push(tx);
        rx
    }

    /// Bind a new stream. An empty or placeholder URL is rejected with
    /// an advisory error and nothing else changes.
    pub fn load_stream(&mut self, url: &str) {
        if is_unset_stream_url(url) {
            self.state.error = Some(PlayerError::StreamNotConfigured.to_string());
            self.publish();
            return;
        }

        self.generation += 1;

        self.state.error = None;
        self.state.is_loading = true;
        self.state.is_playing = false;
        self.state.stream_url = Some(url.to_string());
        self.state.current_time = 0.0;
        self.state.duration = None;

        self.controller.send(PlayerCommand::LoadStream {
            url: url.to_string(),
            generation: self.generation,
        });
        self.publish();
    }

    /// Ask the engine to start playback. No-op without a bound stream —
    /// not even an error. The outcome arrives later as a `Playing` or
    /// `Error` event.
    pub fn play(&mut self) {
        if self.state.stream_url.is_none() {
            return;
        }
        self.controller.send(PlayerCommand::Play);
    }

    /// Stop playback. Applied immediately; pausing a bound stream always
    /// succeeds.
    pub fn pause(&mut self) {
        if self.state.stream_url.is_none() {
            return;
        }
        self.controller.send(PlayerCommand::Pause);
        self.state.is_playing = false;
        self.publish();
    }

    /// Set the volume. Contract: `v` in `0.0..=1.0`, not clamped here.
    /// Choosing 0 also mutes; the flags travel together in that
    /// direction only.
    pub fn set_volume(&mut self, v: f32) {
        self.state.volume = v;
        self.state.is_muted = v == 0.0;
        self.push_gain();
        self.persist_volume();
        self.publish();
    }

    /// Flip the mute flag. The stored volume is untouched, so unmuting
    /// restores the previous level.
    pub fn toggle_mute(&mut self) {
        self.state.is_muted = !self.state.is_muted;
        self.push_gain();
        self.publish();
    }

    /// Jump to `t` seconds. Non-finite values are ignored; negative ones
    /// floor at 0. There is deliberately no upper clamp against the
    /// known duration.
    pub fn seek(&mut self, t: f64) {
        if !t.is_finite() || self.state.stream_url.is_none() {
            return;
        }
        let t = t.max(0.0);

        // Position updates now; the engine confirms or complains later.
        self.state.current_time = t;
        self.controller.send(PlayerCommand::Seek(t));
        self.publish();
    }

    /// Apply all pending engine events. Call this from the embedder's
    /// tick; it never blocks. Returns true when state changed.
    pub fn drain_events(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            changed |= self.apply_event(event);
        }
        if changed {
            self.publish();
        }
        changed
    }

    /// Ask the engine thread to exit. Dropping every controller clone
    /// has the same effect; this just makes it immediate.
    pub fn shutdown(&self) {
        self.controller.send(PlayerCommand::Shutdown);
    }

    fn apply_event(&mut self, event: PlayerEvent) -> bool {
        if event_generation(&event) != self.generation {
            // Leftover from a superseded load; a newer stream owns the
            // state now.
            log::debug!("dropping stale event: {event:?}");
            return false;
        }

        match event {
            PlayerEvent::MetadataReady { duration, .. } => {
                self.state.duration = duration;
                self.state.is_loading = false;
            }
            PlayerEvent::Playing { .. } => {
                self.state.is_playing = true;
                self.state.error = None;
            }
            PlayerEvent::Paused { .. } => {
                self.state.is_playing = false;
            }
            PlayerEvent::Position { seconds, .. } => {
                self.state.current_time = seconds;
            }
            PlayerEvent::Ended { .. } => {
                // A finished stream parks in paused, ready for a retry.
                self.state.is_playing = false;
            }
            PlayerEvent::Error { error, .. } => {
                self.state.error = Some(error.to_string());
                self.state.is_loading = false;
            }
        }

        true
    }

    fn push_gain(&self) {
        self.controller
            .send(PlayerCommand::SetVolume(self.state.effective_volume()));
    }

    fn persist_volume(&self) {
        let Some(dir) = &self.settings_dir else {
            return;
        };
        let settings = PlayerSettings {
            volume: self.state.volume,
        };
        if let Err(e) = settings.save(dir) {
            log::warn!("volume not persisted: {e}");
        }
    }

    fn publish(&mut self) {
        let state = self.state.clone();
        self.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
    }
}

fn event_generation(event: &PlayerEvent) -> u64 {
    match event {
        PlayerEvent::MetadataReady { generation, .. }
        | PlayerEvent::Playing { generation, .. }
        | PlayerEvent::Paused { generation, .. }
        | PlayerEvent::Position { generation, .. }
        | PlayerEvent::Ended { generation, .. }
        | PlayerEvent::Error { generation, .. } => *generation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STREAM_URL_PLACEHOLDER;
    use tempfile::TempDir;

    const URL: &str = "https://stream.example.edu/live.mp3";

    /// A session wired to bare channels: the tests play the engine.
    fn harness() -> (
        PlayerSession,
        Receiver<PlayerCommand>,
        Sender<PlayerEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let session = PlayerSession::with_engine(
            PlayerController::new(command_tx),
            event_rx,
            None,
        );
        (session, command_rx, event_tx)
    }

    fn bind_stream(
        session: &mut PlayerSession,
        commands: &Receiver<PlayerCommand>,
        events: &Sender<PlayerEvent>,
        duration: Option<f64>,
    ) {
        session.load_stream(URL);
        match commands.try_recv().unwrap() {
            PlayerCommand::LoadStream { url, generation } => {
                assert_eq!(url, URL);
                events
                    .send(PlayerEvent::MetadataReady {
                        generation,
                        duration,
                    })
                    .unwrap();
            }
            other => panic!("unexpected command: {other:?}"),
        }
        session.drain_events();
    }

    #[test]
    fn set_volume_tracks_mute_on_zero() {
        let (mut session, commands, _events) = harness();

        for v in [1.0_f32, 0.5, 0.25, 0.0] {
            session.set_volume(v);
            assert_eq!(session.state().volume, v);
            assert_eq!(session.state().is_muted, v == 0.0);
            match commands.try_recv().unwrap() {
                PlayerCommand::SetVolume(gain) => assert_eq!(gain, v),
                other => panic!("unexpected command: {other:?}"),
            }
        }
    }

    #[test]
    fn toggle_mute_twice_restores_state() {
        let (mut session, commands, _events) = harness();
        session.set_volume(0.7);
        let _ = commands.try_recv();

        session.toggle_mute();
        assert!(session.state().is_muted);
        assert_eq!(session.state().volume, 0.7);
        assert!(matches!(
            commands.try_recv().unwrap(),
            PlayerCommand::SetVolume(gain) if gain == 0.0
        ));

        session.toggle_mute();
        assert!(!session.state().is_muted);
        assert_eq!(session.state().volume, 0.7);
        assert!(matches!(
            commands.try_recv().unwrap(),
            PlayerCommand::SetVolume(gain) if gain == 0.7
        ));
    }

    #[test]
    fn load_stream_rejects_unset_urls() {
        let (mut session, commands, _events) = harness();

        for bad in ["", STREAM_URL_PLACEHOLDER] {
            session.load_stream(bad);
            assert!(session.state().stream_url.is_none());
            let message = session.state().error.clone().unwrap();
            assert!(!message.is_empty());
            // The rejection never reaches the engine.
            assert!(commands.try_recv().is_err());
        }
    }

    #[test]
    fn load_then_metadata_fills_duration() {
        let (mut session, commands, events) = harness();

        session.load_stream(URL);
        assert!(session.state().is_loading);
        assert_eq!(session.state().stream_url.as_deref(), Some(URL));
        assert!(session.state().error.is_none());

        match commands.try_recv().unwrap() {
            PlayerCommand::LoadStream { url, generation } => {
                assert_eq!(url, URL);
                assert_eq!(generation, 1);
                events
                    .send(PlayerEvent::MetadataReady {
                        generation,
                        duration: Some(180.0),
                    })
                    .unwrap();
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(session.drain_events());
        assert_eq!(session.state().duration, Some(180.0));
        assert!(!session.state().is_loading);
    }

    #[test]
    fn play_without_stream_is_a_silent_noop() {
        let (mut session, commands, _events) = harness();

        session.play();
        assert!(!session.state().is_playing);
        assert!(session.state().error.is_none());
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn play_confirms_asynchronously() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, None);

        session.play();
        assert!(matches!(commands.try_recv().unwrap(), PlayerCommand::Play));
        // Not playing until the engine says so.
        assert!(!session.state().is_playing);

        events.send(PlayerEvent::Playing { generation: 1 }).unwrap();
        session.drain_events();
        assert!(session.state().is_playing);
        assert!(session.state().error.is_none());
    }

    #[test]
    fn play_rejection_sets_message_only() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, None);

        session.play();
        let _ = commands.try_recv();
        events
            .send(PlayerEvent::Error {
                generation: 1,
                error: PlayerError::Playback("output device unavailable".into()),
            })
            .unwrap();
        session.drain_events();

        assert!(!session.state().is_playing);
        assert!(session.state().error.as_deref().unwrap().contains("playback failed"));

        // Advisory only: a retry goes straight back out.
        session.play();
        assert!(matches!(commands.try_recv().unwrap(), PlayerCommand::Play));
    }

    #[test]
    fn pause_applies_immediately() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, None);
        session.play();
        let _ = commands.try_recv();
        events.send(PlayerEvent::Playing { generation: 1 }).unwrap();
        session.drain_events();

        session.pause();
        assert!(!session.state().is_playing);
        assert!(matches!(commands.try_recv().unwrap(), PlayerCommand::Pause));
    }

    #[test]
    fn seek_past_duration_is_not_clamped() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, Some(100.0));

        session.seek(250.0);
        assert_eq!(session.state().current_time, 250.0);
        assert_eq!(session.state().duration, Some(100.0));
        assert!(matches!(
            commands.try_recv().unwrap(),
            PlayerCommand::Seek(t) if t == 250.0
        ));
    }

    #[test]
    fn seek_guards_bad_positions() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, Some(100.0));

        session.seek(f64::NAN);
        session.seek(f64::INFINITY);
        assert_eq!(session.state().current_time, 0.0);
        assert!(commands.try_recv().is_err());

        session.seek(-5.0);
        assert_eq!(session.state().current_time, 0.0);
        assert!(matches!(
            commands.try_recv().unwrap(),
            PlayerCommand::Seek(t) if t == 0.0
        ));
    }

    #[test]
    fn stale_generation_events_are_dropped() {
        let (mut session, commands, events) = harness();

        session.load_stream("https://stream.example.edu/old.mp3");
        let _ = commands.try_recv();
        session.load_stream(URL);
        let _ = commands.try_recv();

        // The first load answers late; its generation lost.
        events
            .send(PlayerEvent::MetadataReady {
                generation: 1,
                duration: Some(42.0),
            })
            .unwrap();
        events.send(PlayerEvent::Playing { generation: 1 }).unwrap();
        session.drain_events();

        assert!(session.state().is_loading);
        assert!(session.state().duration.is_none());
        assert!(!session.state().is_playing);

        // The current load's answer still lands.
        events
            .send(PlayerEvent::MetadataReady {
                generation: 2,
                duration: None,
            })
            .unwrap();
        session.drain_events();
        assert!(!session.state().is_loading);
    }

    #[test]
    fn new_load_clears_previous_error() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, None);

        events
            .send(PlayerEvent::Error {
                generation: 1,
                error: PlayerError::Load("connection reset".into()),
            })
            .unwrap();
        session.drain_events();
        assert!(session.state().error.is_some());

        session.load_stream(URL);
        assert!(session.state().error.is_none());
    }

    #[test]
    fn stream_end_parks_in_paused() {
        let (mut session, commands, events) = harness();
        bind_stream(&mut session, &commands, &events, None);
        session.play();
        let _ = commands.try_recv();
        events.send(PlayerEvent::Playing { generation: 1 }).unwrap();
        session.drain_events();

        events.send(PlayerEvent::Ended { generation: 1 }).unwrap();
        session.drain_events();
        assert!(!session.state().is_playing);
        assert!(session.state().error.is_none());
    }

    #[test]
    fn subscribers_get_snapshots() {
        let (mut session, _commands, _events) = harness();

        let rx = session.subscribe();
        let initial = rx.try_recv().unwrap();
        assert_eq!(initial, PlaybackState::default());

        session.set_volume(0.4);
        let updated = rx.try_recv().unwrap();
        assert_eq!(updated.volume, 0.4);
    }

    #[test]
    fn volume_is_restored_and_written_through() {
        let dir = TempDir::new().unwrap();
        PlayerSettings { volume: 0.3 }.save(dir.path()).unwrap();

        let (command_tx, command_rx) = mpsc::channel();
        let (_event_tx, event_rx) = mpsc::channel();
        let mut session = PlayerSession::with_engine(
            PlayerController::new(command_tx),
            event_rx,
            Some(dir.path().to_path_buf()),
        );

        assert_eq!(session.state().volume, 0.3);
        assert!(!session.state().is_muted);
        // The restored level reached the engine too.
        assert!(matches!(
            command_rx.try_recv().unwrap(),
            PlayerCommand::SetVolume(gain) if gain == 0.3
        ));

        session.set_volume(0.8);
        let saved = PlayerSettings::load(dir.path()).unwrap();
        assert_eq!(saved.volume, 0.8);
    }

    #[test]
    fn restoring_zero_volume_restores_mute() {
        let dir = TempDir::new().unwrap();
        PlayerSettings { volume: 0.0 }.save(dir.path()).unwrap();

        let (command_tx, _command_rx) = mpsc::channel();
        let (_event_tx, event_rx) = mpsc::channel();
        let session = PlayerSession::with_engine(
            PlayerController::new(command_tx),
            event_rx,
            Some(dir.path().to_path_buf()),
        );

        assert_eq!(session.state().volume, 0.0);
        assert!(session.state().is_muted);
    }
}
