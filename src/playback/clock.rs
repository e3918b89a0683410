use std::sync::Arc;

use tokio::time::Instant;

use crate::types::PcmBuffer;

/// The playback engine the controller drives.
///
/// Commands may take effect asynchronously: after `play()` a clock is free to
/// keep reporting `paused() == true` (media not ready, output failed, ...).
/// The controller treats `paused()` and `current_time()` as the source of truth.
pub trait MediaClock: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn paused(&self) -> bool;

    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);

    fn volume(&self) -> f32;
    fn set_volume(&mut self, volume: f32);

    fn playback_rate(&self) -> f32;
    fn set_playback_rate(&mut self, rate: f32);

    fn looping(&self) -> bool;
    fn set_looping(&mut self, looping: bool);

    /// Hand decoded audio to clocks that render it themselves.
    fn load_source(&mut self, _source: Arc<PcmBuffer>) {}
}

/// Headless media clock: the position advances with wall time scaled by the
/// playback rate. It pauses at the end of the media unless looping.
#[derive(Debug, Clone)]
pub struct SoftwareClock {
    /// Seconds, `None` until a source is loaded
    duration: Option<f64>,
    base_position: f64,
    /// Set while playing; position = base + elapsed * rate
    started_at: Option<Instant>,
    volume: f32,
    rate: f32,
    looping: bool,
}

impl Default for SoftwareClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareClock {
    pub fn new() -> Self {
        Self {
            duration: None,
            base_position: 0.0,
            started_at: None,
            volume: 1.0,
            rate: 1.0,
            looping: false,
        }
    }

    pub fn with_duration(duration: f64) -> Self {
        let mut clock = Self::new();
        clock.duration = (duration > 0.0).then_some(duration);
        clock
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn unbounded_position(&self) -> f64 {
        match self.started_at {
            Some(start) => self.base_position + start.elapsed().as_secs_f64() * self.rate as f64,
            None => self.base_position,
        }
    }

    fn reached_end(&self) -> bool {
        match self.duration {
            Some(d) => !self.looping && self.unbounded_position() >= d,
            None => false,
        }
    }

    /// Fold elapsed time into the base position before changing rate or loop.
    fn rebase(&mut self) {
        let position = self.current_time();
        let ended = self.reached_end();
        self.base_position = position;
        if ended {
            self.started_at = None;
        } else if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }
}

impl MediaClock for SoftwareClock {
    fn play(&mut self) {
        if self.started_at.is_some() && !self.reached_end() {
            return;
        }
        let position = self.current_time();
        self.base_position = match self.duration {
            Some(d) if position >= d => 0.0,
            _ => position,
        };
        self.started_at = Some(Instant::now());
    }

    fn pause(&mut self) {
        self.base_position = self.current_time();
        self.started_at = None;
    }

    fn paused(&self) -> bool {
        self.started_at.is_none() || self.reached_end()
    }

    fn current_time(&self) -> f64 {
        let position = self.unbounded_position();
        match self.duration {
            Some(d) if self.looping => position % d,
            Some(d) => position.min(d),
            None => position,
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        // Ended playback is paused; a seek must not restart it
        if self.reached_end() {
            self.started_at = None;
        }
        self.base_position = match self.duration {
            Some(d) => seconds.min(d),
            None => seconds,
        };
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn playback_rate(&self) -> f32 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.rebase();
        self.rate = rate;
    }

    fn looping(&self) -> bool {
        self.looping
    }

    fn set_looping(&mut self, looping: bool) {
        self.rebase();
        self.looping = looping;
    }

    fn load_source(&mut self, source: Arc<PcmBuffer>) {
        let duration = source.duration();
        self.duration = (duration > 0.0).then_some(duration);
        self.base_position = 0.0;
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_with_rate() {
        let mut clock = SoftwareClock::with_duration(60.0);
        clock.play();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!clock.paused());
        assert!((clock.current_time() - 2.0).abs() < 1e-6);

        clock.set_playback_rate(2.0);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!((clock.current_time() - 4.0).abs() < 1e-6);

        clock.pause();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(clock.paused());
        assert!((clock.current_time() - 4.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_end_unless_looping() {
        let mut clock = SoftwareClock::with_duration(3.0);
        clock.play();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(clock.paused());
        assert_eq!(clock.current_time(), 3.0);

        // Playing again from the end restarts
        clock.play();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!((clock.current_time() - 1.0).abs() < 1e-6);

        clock.set_looping(true);
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!clock.paused());
        assert!((clock.current_time() - 1.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_after_end_stays_paused() {
        let mut clock = SoftwareClock::with_duration(3.0);
        clock.play();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(clock.paused());

        clock.set_current_time(1.0);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(clock.paused());
        assert_eq!(clock.current_time(), 1.0);

        // Rate and loop changes after the end do not restart it either
        clock.set_playback_rate(2.0);
        clock.set_looping(true);
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(clock.paused());
        assert_eq!(clock.current_time(), 1.0);
    }

    #[test]
    fn seek_is_bounded_by_duration() {
        let mut clock = SoftwareClock::with_duration(10.0);
        clock.set_current_time(25.0);
        assert_eq!(clock.current_time(), 10.0);
        clock.set_current_time(-4.0);
        assert_eq!(clock.current_time(), 0.0);
        clock.set_current_time(f64::NAN);
        assert_eq!(clock.current_time(), 0.0);
    }

    #[test]
    fn loading_a_source_sets_duration_and_rewinds() {
        let mut clock = SoftwareClock::new();
        clock.set_current_time(7.0);
        assert_eq!(clock.current_time(), 7.0);

        clock.load_source(Arc::new(PcmBuffer::new(vec![vec![0.0; 8000]], 4000)));
        assert_eq!(clock.duration(), Some(2.0));
        assert_eq!(clock.current_time(), 0.0);
        assert!(clock.paused());
    }
}
