use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::clock::MediaClock;
use crate::types::PcmBuffer;

/// Wrapper to make cpal::Stream storable in the clock (it's !Send but is only
/// touched on creation and drop)
struct StreamHolder(#[allow(dead_code)] cpal::Stream);
unsafe impl Send for StreamHolder {}

struct OutputInner {
    source: Option<Arc<PcmBuffer>>,
    volume: f32,
    speed: f32,
    looping: bool,
}

/// Media clock that plays the loaded source on the default output device.
///
/// The audio callback owns the playhead; `current_time` reads it lock-free.
pub struct CpalClock {
    inner: Arc<Mutex<OutputInner>>,
    /// Lock-free position in seconds (f64 bits stored as u64)
    position: Arc<AtomicU64>,
    playing: Arc<AtomicBool>,
    _stream: StreamHolder,
    output_sample_rate: u32,
    output_channels: u16,
}

impl CpalClock {
    pub fn new() -> Result<Self, String> {
        let inner = Arc::new(Mutex::new(OutputInner {
            source: None,
            volume: 1.0,
            speed: 1.0,
            looping: false,
        }));
        let position = Arc::new(AtomicU64::new(0f64.to_bits()));
        let playing = Arc::new(AtomicBool::new(false));

        let (stream, sample_rate, channels) = build_output_stream(&inner, &position, &playing)?;
        stream
            .play()
            .map_err(|e| format!("Failed to start output: {}", e))?;
        log::info!("Output stream started: {}Hz {}ch", sample_rate, channels);

        Ok(Self {
            inner,
            position,
            playing,
            _stream: StreamHolder(stream),
            output_sample_rate: sample_rate,
            output_channels: channels,
        })
    }

    pub fn output_config(&self) -> (u32, u16) {
        (self.output_sample_rate, self.output_channels)
    }

    fn duration(&self) -> f64 {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.source.as_ref().map(|s| s.duration()))
            .unwrap_or(0.0)
    }

    fn with_inner(&self, f: impl FnOnce(&mut OutputInner)) {
        match self.inner.lock() {
            Ok(mut inner) => f(&mut inner),
            Err(e) => log::error!("Output state poisoned: {}", e),
        }
    }
}

impl MediaClock for CpalClock {
    fn play(&mut self) {
        let duration = self.duration();
        if duration > 0.0 && self.current_time() >= duration {
            self.position.store(0f64.to_bits(), Ordering::Relaxed);
        }
        self.playing.store(true, Ordering::Relaxed);
        log::info!("Playback started at {:.2}s", self.current_time());
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::Relaxed);
        log::info!("Playback paused at {:.2}s", self.current_time());
    }

    fn paused(&self) -> bool {
        !self.playing.load(Ordering::Relaxed)
    }

    fn current_time(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Relaxed))
    }

    fn set_current_time(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        let duration = self.duration();
        let seconds = if duration > 0.0 { seconds.min(duration) } else { seconds };
        self.position.store(seconds.to_bits(), Ordering::Relaxed);
    }

    fn volume(&self) -> f32 {
        self.inner.lock().map(|i| i.volume).unwrap_or(1.0)
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_inner(|inner| inner.volume = volume);
    }

    fn playback_rate(&self) -> f32 {
        self.inner.lock().map(|i| i.speed).unwrap_or(1.0)
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.with_inner(|inner| inner.speed = rate);
    }

    fn looping(&self) -> bool {
        self.inner.lock().map(|i| i.looping).unwrap_or(false)
    }

    fn set_looping(&mut self, looping: bool) {
        self.with_inner(|inner| inner.looping = looping);
    }

    fn load_source(&mut self, source: Arc<PcmBuffer>) {
        log::info!(
            "Output source loaded: {}Hz {}ch, {} frames",
            source.sample_rate(),
            source.channel_count(),
            source.frames()
        );
        self.playing.store(false, Ordering::Relaxed);
        self.position.store(0f64.to_bits(), Ordering::Relaxed);
        self.with_inner(|inner| inner.source = Some(source));
    }
}

// ── cpal audio callback ──

fn build_output_stream(
    inner: &Arc<Mutex<OutputInner>>,
    position: &Arc<AtomicU64>,
    playing: &Arc<AtomicBool>,
) -> Result<(cpal::Stream, u32, u16), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("No output device available")?;

    let supported = device
        .default_output_config()
        .map_err(|e| format!("Failed to get output config: {}", e))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.into();

    let inner_ref = inner.clone();
    let position_ref = position.clone();
    let playing_ref = playing.clone();

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !playing_ref.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }

                let Ok(inner) = inner_ref.lock() else {
                    data.fill(0.0);
                    return;
                };
                let Some(source) = inner.source.as_ref().filter(|s| !s.is_empty()) else {
                    data.fill(0.0);
                    return;
                };

                let start_bits = position_ref.load(Ordering::Relaxed);
                let (end, ended) = render_block(
                    data,
                    &inner,
                    source,
                    f64::from_bits(start_bits),
                    channels as usize,
                    sample_rate,
                );
                if commit_position(&position_ref, start_bits, end) && ended {
                    playing_ref.store(false, Ordering::Relaxed);
                }
            },
            |err| {
                log::error!("Playback output error: {}", err);
            },
            None,
        )
        .map_err(|e| format!("Failed to build output stream: {}", e))?;

    Ok((stream, sample_rate, channels))
}

/// Fill `data` from `source` starting at `start` seconds. Returns the position
/// after the block and whether the end of the media was reached.
fn render_block(
    data: &mut [f32],
    inner: &OutputInner,
    source: &PcmBuffer,
    start: f64,
    out_channels: usize,
    out_rate: u32,
) -> (f64, bool) {
    let src_ch = source.channel_count();
    let src_rate = source.sample_rate() as f64;
    let frames = source.frames();
    let step = inner.speed.max(0.01) as f64 / out_rate as f64;

    let mut pos = start;
    let mut ended = false;

    for frame in data.chunks_mut(out_channels) {
        if ended || (pos * src_rate) as usize >= frames {
            if inner.looping && !ended {
                pos = 0.0;
            } else {
                // End of media: stop like a media element does
                pos = source.duration();
                ended = true;
                frame.fill(0.0);
                continue;
            }
        }

        let index = ((pos * src_rate) as usize).min(frames.saturating_sub(1));
        for (c, out) in frame.iter_mut().enumerate() {
            let channel = &source.channels()[c.min(src_ch - 1)];
            *out = channel[index] * inner.volume;
        }

        pos += step;
    }

    (pos, ended)
}

/// Publish the advanced playhead unless a seek replaced it while the block
/// was rendering. Returns `false` when the seek wins.
fn commit_position(position: &AtomicU64, start_bits: u64, end: f64) -> bool {
    position
        .compare_exchange(start_bits, end.to_bits(), Ordering::AcqRel, Ordering::Relaxed)
        .is_ok()
}
