//! playback/output.rs
//! The native audio output seam.
//!
//! The engine talks to a trait, not to rodio: production binds the
//! default device through [`RodioOutput`], tests script a fake. Methods
//! take `&mut self` — the engine owns its output and drives it from one
//! thread.

use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};

use super::stream;
use crate::error::PlayerError;

/// What the engine needs from a native audio output.
pub trait AudioOutput {
    /// Bind `url`, leaving the new source paused. Returns the duration
    /// in seconds when the container reports one (live feeds don't).
    fn load(&mut self, url: &str) -> Result<Option<f64>, PlayerError>;

    /// Start or resume the bound source.
    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self);

    /// Drop the bound source, if any.
    fn stop(&mut self);

    fn seek(&mut self, seconds: f64) -> Result<(), PlayerError>;

    fn set_volume(&mut self, gain: f32);

    /// Playback position of the bound source, in seconds.
    fn position(&self) -> f64;

    fn is_playing(&self) -> bool;

    /// True once the bound source has run dry.
    fn finished(&self) -> bool;
}

/// Rodio-backed output: one `OutputStream` for the engine's lifetime,
/// one `Sink` per bound stream.
pub struct RodioOutput {
    // Keep this alive for the lifetime of the output!
    stream: OutputStream,
    sink: Option<Sink>,
}

impl RodioOutput {
    /// Open the default audio device. Call this on the thread that will
    /// keep the handle.
    pub fn open() -> Result<Self, PlayerError> {
        // rodio 0.21.x: build/open the default output stream via OutputStreamBuilder
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlayerError::Playback(format!("audio output init failed: {e}")))?;

        Ok(Self { stream, sink: None })
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, url: &str) -> Result<Option<f64>, PlayerError> {
        self.stop();

        let (source, duration) = stream::open_stream(url)?;

        // rodio 0.21.x: Sink is created from the stream's mixer
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.append(source);
        self.sink = Some(sink);

        Ok(duration)
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        match &self.sink {
            Some(sink) => {
                sink.play();
                Ok(())
            }
            None => Err(PlayerError::Playback("no stream bound".into())),
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn seek(&mut self, seconds: f64) -> Result<(), PlayerError> {
        let Some(sink) = &self.sink else {
            return Err(PlayerError::Seek("no stream bound".into()));
        };

        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PlayerError::Seek(format!("bad position {seconds}")));
        }

        // Live network sources reject this; the caller gets an advisory
        // error, not a broken sink.
        sink.try_seek(Duration::from_secs_f64(seconds))
            .map_err(|e| PlayerError::Seek(e.to_string()))
    }

    fn set_volume(&mut self, gain: f32) {
        if let Some(sink) = &self.sink {
            sink.set_volume(gain);
        }
    }

    fn position(&self) -> f64 {
        self.sink
            .as_ref()
            .map(|s| s.get_pos().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn is_playing(&self) -> bool {
        self.sink
            .as_ref()
            .map(|s| !s.is_paused() && !s.empty())
            .unwrap_or(false)
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().map(|s| s.empty()).unwrap_or(false)
    }
}
