//! Waveform player session
//!
//! Ties the loader, the playback controller and the poll loop together for
//! one component lifetime: `attach` starts the load and the poll loop,
//! `teardown` (or drop) stops playback and cancels both. Load completions
//! are tagged with a load id so a superseded or late load never touches
//! the state.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::WaveConfig;
use crate::loader::{load_audio, Decoder, Fetcher};
use crate::playback::{Key, KeyOutcome, MediaClock, PlaybackController, PlaybackState, PollLoop};
use crate::waveform::Envelope;

struct SessionState<C: MediaClock> {
    controller: PlaybackController<C>,
    envelope: Option<Envelope>,
}

pub struct WaveSession<C: MediaClock + 'static> {
    shared: Arc<Mutex<SessionState<C>>>,
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn Decoder>,
    poll: Option<PollLoop>,
    load: Option<JoinHandle<()>>,
    /// Flipped to `true` on teardown; wakes anyone waiting on the load
    detached: watch::Sender<bool>,
}

fn lock<C: MediaClock>(shared: &Mutex<SessionState<C>>) -> MutexGuard<'_, SessionState<C>> {
    shared.lock().unwrap_or_else(|poisoned| {
        log::warn!("Session state lock poisoned, recovering");
        poisoned.into_inner()
    })
}

impl<C: MediaClock + 'static> WaveSession<C> {
    /// Mount a player for `source`. Must be called inside a tokio runtime.
    ///
    /// Without a clock nothing is fetched and no poll loop runs; the state
    /// stays in its initial loading form.
    pub fn attach(
        config: WaveConfig,
        clock: Option<C>,
        source: &str,
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn Decoder>,
    ) -> Self {
        let poll_interval = config.poll_interval();
        let controller = match clock {
            Some(clock) => PlaybackController::with_clock(config, clock),
            None => PlaybackController::new(config, false),
        };
        let has_media_clock = controller.has_media_clock();

        let mut session = Self {
            shared: Arc::new(Mutex::new(SessionState {
                controller,
                envelope: None,
            })),
            fetcher,
            decoder,
            poll: None,
            load: None,
            detached: watch::channel(false).0,
        };

        if !has_media_clock {
            log::info!("No media clock, skipping load of {}", source);
            return session;
        }

        session.reload(source);

        let shared = session.shared.clone();
        session.poll = Some(PollLoop::start(poll_interval, move || {
            lock(&shared).controller.reconcile();
        }));

        session
    }

    /// Load a new source, superseding any load still in flight.
    pub fn reload(&mut self, source: &str) {
        let (load_id, samples) = {
            let mut guard = lock(&self.shared);
            if !guard.controller.has_media_clock() || !guard.controller.is_attached() {
                return;
            }
            if let Some(previous) = self.load.take() {
                previous.abort();
            }
            let load_id = Uuid::new_v4();
            guard.controller.begin_load(load_id);
            guard.envelope = None;
            log::info!("Load {} started for {}", load_id, source);
            (load_id, guard.controller.config().samples)
        };

        let shared = self.shared.clone();
        let fetcher = self.fetcher.clone();
        let decoder = self.decoder.clone();
        let source = source.to_string();

        self.load = Some(tokio::spawn(async move {
            let result = load_audio(&source, fetcher.as_ref(), decoder, samples).await;

            let mut guard = lock(&shared);
            match result {
                Ok(loaded) => {
                    let duration = loaded.duration();
                    if guard.controller.complete_load(load_id, loaded.pcm) {
                        guard.envelope = Some(loaded.envelope);
                        log::info!("Load {} complete: {:.2}s", load_id, duration);
                    }
                }
                Err(e) => {
                    guard.controller.fail_load(load_id, &e);
                }
            }
        }));
    }

    /// Run `f` with exclusive access to the controller.
    pub fn with_controller<R>(&self, f: impl FnOnce(&mut PlaybackController<C>) -> R) -> R {
        f(&mut lock(&self.shared).controller)
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.shared).controller.state().clone()
    }

    /// The extracted envelope, once the current load has completed.
    pub fn envelope(&self) -> Option<Envelope> {
        lock(&self.shared).envelope.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        lock(&self.shared).controller.subscribe()
    }

    /// Wait until the current load has finished, successfully or not, or the
    /// session is torn down. Returns immediately when there is no media clock.
    pub async fn wait_until_loaded(&self) -> PlaybackState {
        let idle = self.with_controller(|c| !c.has_media_clock() || !c.is_attached());
        if idle {
            return self.state();
        }

        let mut rx = self.subscribe();
        let mut detached = self.detached.subscribe();
        tokio::select! {
            result = rx.wait_for(|state| !state.is_loading) => {
                if let Ok(state) = result {
                    return state.clone();
                }
            }
            _ = detached.wait_for(|detached| *detached) => {}
        }
        self.state()
    }

    pub fn play(&self, at: Option<f64>) {
        self.with_controller(|c| c.play(at));
    }

    pub fn pause(&self) {
        self.with_controller(|c| c.pause());
    }

    pub fn stop(&self) {
        self.with_controller(|c| c.stop());
    }

    pub fn toggle_play(&self) {
        self.with_controller(|c| c.toggle_play());
    }

    pub fn set_volume(&self, volume: f32) {
        self.with_controller(|c| c.set_volume(volume));
    }

    pub fn set_playback_rate(&self, rate: f32) {
        self.with_controller(|c| c.set_playback_rate(rate));
    }

    pub fn set_loop(&self, looping: bool) {
        self.with_controller(|c| c.set_loop(looping));
    }

    pub fn mute(&self) {
        self.with_controller(|c| c.mute());
    }

    pub fn unmute(&self) {
        self.with_controller(|c| c.unmute());
    }

    pub fn toggle_mute(&self) {
        self.with_controller(|c| c.toggle_mute());
    }

    pub fn seek_to_offset(&self, offset_x: f64) {
        self.with_controller(|c| c.seek_to_offset(offset_x));
    }

    pub fn handle_key(&self, key: Key) -> KeyOutcome {
        self.with_controller(|c| c.handle_key(key))
    }

    pub fn on_pause_change(&self, paused: bool) {
        self.with_controller(|c| c.on_pause_change(paused));
    }

    /// Cancel polling and any in-flight load, then stop the clock. Idempotent.
    pub fn teardown(&mut self) {
        if let Some(mut poll) = self.poll.take() {
            poll.cancel();
        }
        if let Some(load) = self.load.take() {
            load.abort();
        }
        lock(&self.shared).controller.teardown();
        self.detached.send_replace(true);
    }
}

impl<C: MediaClock + 'static> Drop for WaveSession<C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
