//! playback/stream.rs
//! Stream plumbing (ureq fetch + Symphonia) -> rodio::Source.

use std::fs::File;
use std::time::Duration;

use rodio::Source;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions, ReadOnlySource};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::error::PlayerError;

/// True when `url` is fetched over the network rather than the
/// filesystem.
pub(crate) fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Extension of the URL's last path segment, query/fragment stripped.
///
/// `"https://radio.example.edu/live.mp3?nocache=1"` -> `Some("mp3")`
pub(crate) fn extension_hint(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Open `url` and return a ready source plus its duration, when the
/// container reports one.
///
/// HTTP responses are wrapped as non-seekable media; plain paths (local
/// fixtures, offline use) are read from disk. No read timeout is imposed
/// on the network side — a stalled feed surfaces later, when the decode
/// loop runs dry.
pub(crate) fn open_stream(url: &str) -> Result<(StreamSource, Option<f64>), PlayerError> {
    let mss = if is_http_url(url) {
        let response = ureq::get(url)
            .call()
            .map_err(|e| PlayerError::Load(format!("fetch {url}: {e}")))?;
        let reader = response.into_body().into_reader();
        MediaSourceStream::new(
            Box::new(ReadOnlySource::new(reader)),
            MediaSourceStreamOptions::default(),
        )
    } else {
        let file = File::open(url).map_err(|e| PlayerError::Load(format!("open {url}: {e}")))?;
        MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default())
    };

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint(url) {
        hint.with_extension(&ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::Load(format!("format probe failed: {e}")))?;

    let format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| PlayerError::Load("no supported audio track found".into()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    // Duration needs time_base + n_frames; live feeds report neither.
    let duration = duration_from_params(codec_params.time_base, codec_params.n_frames);

    let decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| PlayerError::Load(format!("decoder init failed: {e}")))?;

    Ok((StreamSource::new(format, decoder, track_id), duration))
}

fn duration_from_params(time_base: Option<TimeBase>, n_frames: Option<u64>) -> Option<f64> {
    let tb = time_base?;
    let frames = n_frames?;

    // Time is { seconds: u64, frac: f64 } in symphonia 0.5.x.
    let t = tb.calc_time(frames);
    Some(t.seconds as f64 + t.frac)
}

/// A pull-decoding rodio Source backed by Symphonia.
///
/// Packets are decoded on demand as the mixer drains samples. An IO
/// error from the transport (stream closed, connection dropped) ends the
/// source; rodio then reports the sink as empty and the engine turns
/// that into an `Ended` event.
pub(crate) struct StreamSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,

    // Output format for rodio
    sample_rate: u32,
    channels: u16,

    // Interleaved f32 samples ready to be yielded
    out: Vec<f32>,
    out_pos: usize,

    ended: bool,
}

impl StreamSource {
    fn new(format: Box<dyn FormatReader>, decoder: Box<dyn Decoder>, track_id: u32) -> Self {
        let mut this = Self {
            format,
            decoder,
            track_id,
            sample_rate: 44100,
            channels: 2,
            out: Vec::new(),
            out_pos: 0,
            ended: false,
        };

        // Prime once so sample_rate/channels are correct before rodio asks.
        this.refill();

        this
    }

    fn refill(&mut self) {
        self.out.clear();
        self.out_pos = 0;

        loop {
            let packet = match self.format.next_packet() {
                Ok(p) => p,
                // Transport gone: treat as end of stream, not a failure.
                Err(SymphoniaError::IoError(_)) => {
                    self.ended = true;
                    return;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    log::debug!("stream read error, ending source: {e}");
                    self.ended = true;
                    return;
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    self.sample_rate = spec.rate;
                    self.channels = spec.channels.count() as u16;

                    let frames = decoded.frames();
                    let mut buf = SampleBuffer::<f32>::new(frames as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    self.out.extend_from_slice(buf.samples());
                    return;
                }
                // Corrupt packet; skip.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(SymphoniaError::IoError(_)) => {
                    self.ended = true;
                    return;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => {
                    log::debug!("stream decode error, ending source: {e}");
                    self.ended = true;
                    return;
                }
            }
        }
    }
}

impl Iterator for StreamSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        while self.out_pos >= self.out.len() {
            if self.ended {
                return None;
            }
            self.refill();
        }

        let s = self.out[self.out_pos];
        self.out_pos += 1;
        Some(s)
    }
}

impl Source for StreamSource {
    // rodio 0.21 uses current_span_len (not current_frame_len).
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
