use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use super::clock::MediaClock;
use super::keyboard::{Key, KeyOutcome};
use super::state::{clamp_rate, clamp_volume, percent_of, PlaybackState};
use crate::config::WaveConfig;
use crate::error::LoadError;
use crate::types::PcmBuffer;

/// Mediates between user intent and the media clock.
///
/// Transport commands are forwarded to the clock and never assumed to have
/// taken effect: `is_paused` and `current_time` only change on
/// [`reconcile`](Self::reconcile), a pause-change notification, or `stop()`.
/// Volume, rate and loop are applied synchronously by the clock and are
/// updated optimistically.
///
/// Without a media clock (`has_media_clock == false`, e.g. headless
/// rendering) every command is a no-op while state reads stay valid.
pub struct PlaybackController<C: MediaClock> {
    config: WaveConfig,
    has_media_clock: bool,
    clock: Option<C>,
    state: PlaybackState,
    attached: bool,
    current_load: Option<Uuid>,
    publisher: watch::Sender<PlaybackState>,
}

impl<C: MediaClock> PlaybackController<C> {
    pub fn new(config: WaveConfig, has_media_clock: bool) -> Self {
        let state = PlaybackState {
            volume: config.initial_volume(),
            playback_rate: config.initial_playback_rate(),
            looping: config.looping,
            ..PlaybackState::default()
        };
        let (publisher, _) = watch::channel(state.clone());

        Self {
            config,
            has_media_clock,
            clock: None,
            state,
            attached: true,
            current_load: None,
            publisher,
        }
    }

    /// Controller with a media clock already attached.
    pub fn with_clock(config: WaveConfig, clock: C) -> Self {
        let mut controller = Self::new(config, true);
        controller.attach_clock(clock);
        controller
    }

    /// Hand over the clock once the host has created it. The configured
    /// volume, rate and loop flag are applied to it immediately.
    pub fn attach_clock(&mut self, mut clock: C) {
        if !self.has_media_clock {
            log::debug!("No media clock available, ignoring attached clock");
            return;
        }
        clock.set_volume(self.state.volume);
        clock.set_playback_rate(self.state.playback_rate);
        clock.set_looping(self.state.looping);
        self.clock = Some(clock);
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Receives a fresh copy of the state after every change.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.publisher.subscribe()
    }

    pub fn config(&self) -> &WaveConfig {
        &self.config
    }

    pub fn has_media_clock(&self) -> bool {
        self.has_media_clock
    }

    pub fn clock(&self) -> Option<&C> {
        self.clock.as_ref()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Rendered waveform width in pixels (`samples * gap`).
    pub fn width(&self) -> f64 {
        self.config.width()
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn clock_mut(&mut self, command: &str) -> Option<&mut C> {
        if !self.attached || !self.has_media_clock {
            log::debug!("{}: no media clock, ignoring", command);
            return None;
        }
        if self.clock.is_none() {
            log::debug!("{}: media clock not attached yet, ignoring", command);
        }
        self.clock.as_mut()
    }

    // ── Load lifecycle ──

    /// Mark a new load as in flight. Only the latest load may complete.
    pub fn begin_load(&mut self, load_id: Uuid) {
        if !self.attached {
            return;
        }
        self.current_load = Some(load_id);
        self.state.is_loading = true;
        self.state.has_error = false;
        self.publish();
    }

    /// Apply a decoded source. Returns `false` for stale or late completions.
    pub fn complete_load(&mut self, load_id: Uuid, source: Arc<PcmBuffer>) -> bool {
        if !self.accepts_load(load_id) {
            return false;
        }
        self.current_load = None;
        self.state.duration = source.duration();
        self.state.is_loading = false;
        if let Some(clock) = self.clock.as_mut() {
            clock.load_source(source);
        }
        self.publish();
        true
    }

    /// Record a terminal load failure. Returns `false` for stale or late failures.
    pub fn fail_load(&mut self, load_id: Uuid, error: &LoadError) -> bool {
        if !self.accepts_load(load_id) {
            return false;
        }
        log::error!("Audio load {} failed: {}", load_id, error);
        self.current_load = None;
        self.state.has_error = true;
        self.state.is_loading = false;
        self.publish();
        true
    }

    fn accepts_load(&self, load_id: Uuid) -> bool {
        if !self.attached {
            log::debug!("Ignoring load {} completion after teardown", load_id);
            return false;
        }
        if self.current_load != Some(load_id) {
            log::debug!("Ignoring stale load {}", load_id);
            return false;
        }
        true
    }

    // ── Transport ──

    /// Seek to `at` (when given) and start playback.
    pub fn play(&mut self, at: Option<f64>) {
        let target = at.filter(|t| !t.is_nan()).map(|t| self.clamp_time(t));
        let Some(clock) = self.clock_mut("play") else {
            return;
        };
        if let Some(t) = target {
            clock.set_current_time(t);
        }
        clock.play();
    }

    pub fn pause(&mut self) {
        if let Some(clock) = self.clock_mut("pause") {
            clock.pause();
        }
    }

    /// Pause and rewind to the start.
    pub fn stop(&mut self) {
        let Some(clock) = self.clock_mut("stop") else {
            return;
        };
        clock.set_current_time(0.0);
        clock.pause();
        self.state.current_time = 0.0;
        self.state.is_paused = true;
        self.publish();
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_paused {
            self.play(None);
        } else {
            self.pause();
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        let Some(volume) = clamp_volume(volume) else {
            log::warn!("Ignoring non-numeric volume");
            return;
        };
        let Some(clock) = self.clock_mut("set_volume") else {
            return;
        };
        clock.set_volume(volume);
        self.state.volume = volume;
        self.publish();
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        let Some(rate) = clamp_rate(rate) else {
            log::warn!("Ignoring non-numeric playback rate");
            return;
        };
        let Some(clock) = self.clock_mut("set_playback_rate") else {
            return;
        };
        clock.set_playback_rate(rate);
        self.state.playback_rate = rate;
        self.publish();
    }

    pub fn set_loop(&mut self, looping: bool) {
        let Some(clock) = self.clock_mut("set_loop") else {
            return;
        };
        clock.set_looping(looping);
        self.state.looping = looping;
        self.publish();
    }

    pub fn mute(&mut self) {
        self.set_volume(0.0);
    }

    /// Restore the configured volume, not the one in effect before muting.
    pub fn unmute(&mut self) {
        self.set_volume(self.config.initial_volume());
    }

    pub fn toggle_mute(&mut self) {
        if self.state.volume == 0.0 {
            self.unmute();
        } else {
            self.mute();
        }
    }

    /// Seek to the time under a click at `offset_x` pixels and play from there.
    pub fn seek_to_offset(&mut self, offset_x: f64) {
        let click_percent = percent_of(self.width(), offset_x);
        let time = click_percent * self.state.duration / 100.0;
        self.play(Some(time));
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let now = match self.clock_mut("handle_key") {
            Some(clock) => clock.current_time(),
            None => return KeyOutcome::Ignored,
        };
        let duration = self.state.duration;
        let skip = self.config.skip_seconds;

        match key {
            Key::Space | Key::Enter => self.toggle_play(),
            Key::ArrowLeft => self.play(Some((now - skip).max(0.0))),
            Key::ArrowRight => self.play(Some((now + skip).min(duration))),
            Key::Home => self.play(Some(0.0)),
            Key::End => self.play(Some(duration)),
            Key::Other => return KeyOutcome::Ignored,
        }
        KeyOutcome::Consumed
    }

    // ── Reconciliation ──

    /// Overwrite position and paused flag with the clock's reported values.
    pub fn reconcile(&mut self) {
        let Some(clock) = self.clock.as_ref().filter(|_| self.attached) else {
            return;
        };
        let reported_time = clock.current_time();
        let paused = clock.paused();
        let current_time = self.clamp_time(if reported_time.is_finite() {
            reported_time
        } else {
            0.0
        });

        if self.state.current_time != current_time || self.state.is_paused != paused {
            self.state.current_time = current_time;
            self.state.is_paused = paused;
            self.publish();
        }
    }

    /// Play/pause event raised by the media clock.
    pub fn on_pause_change(&mut self, paused: bool) {
        if self.clock_mut("on_pause_change").is_none() {
            return;
        }
        if self.state.is_paused != paused {
            self.state.is_paused = paused;
            self.publish();
        }
    }

    /// Force-stop the clock and refuse further commands and load completions.
    /// Idempotent.
    pub fn teardown(&mut self) {
        if !self.attached {
            return;
        }
        self.stop();
        self.attached = false;
        self.current_load = None;
        self.publish();
        log::debug!("Playback controller torn down");
    }

    /// Clamp to `[0, duration]`, or `[0, ∞)` while the duration is unknown.
    fn clamp_time(&self, seconds: f64) -> f64 {
        let seconds = seconds.max(0.0);
        if self.state.duration > 0.0 {
            seconds.min(self.state.duration)
        } else {
            seconds
        }
    }
}
