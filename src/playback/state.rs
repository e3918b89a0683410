use serde::Serialize;

pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 1.0;
pub const MIN_PLAYBACK_RATE: f32 = 0.25;
pub const MAX_PLAYBACK_RATE: f32 = 4.0;

/// Clamp to `[0.0, 1.0]`; `None` for NaN.
pub fn clamp_volume(volume: f32) -> Option<f32> {
    (!volume.is_nan()).then(|| volume.clamp(MIN_VOLUME, MAX_VOLUME))
}

/// Clamp to `[0.25, 4.0]`; `None` for NaN.
pub fn clamp_rate(rate: f32) -> Option<f32> {
    (!rate.is_nan()).then(|| rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE))
}

/// `value / total` as a percentage, 0 when the ratio is undefined.
pub(crate) fn percent_of(total: f64, value: f64) -> f64 {
    let percent = value / total * 100.0;
    if percent.is_finite() {
        percent
    } else {
        0.0
    }
}

/// Transport state as seen by rendering.
///
/// `current_time` and `is_paused` mirror the media clock as of the last
/// reconciliation; the played percentage is always derived from
/// `current_time` and `duration`, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_paused: bool,
    pub is_loading: bool,
    pub has_error: bool,
    /// Seconds
    pub current_time: f64,
    /// Seconds, 0 while unknown
    pub duration: f64,
    pub volume: f32,
    pub playback_rate: f32,
    pub looping: bool,
}

/// Whole-number progress values for compact displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundedProgress {
    pub played_percent: u32,
    pub current_time: u64,
    pub duration: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_paused: true,
            is_loading: true,
            has_error: false,
            current_time: 0.0,
            duration: 0.0,
            volume: MAX_VOLUME,
            playback_rate: 1.0,
            looping: false,
        }
    }
}

impl PlaybackState {
    /// Exact played percentage in `[0, 100]`, 0 while the duration is unknown.
    pub fn played_percent(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        percent_of(self.duration, self.current_time).clamp(0.0, 100.0)
    }

    /// Share of the waveform still unplayed; the right inset of the progress mask.
    pub fn unplayed_percent(&self) -> f64 {
        100.0 - self.played_percent()
    }

    pub fn rounded(&self) -> RoundedProgress {
        RoundedProgress {
            played_percent: self.played_percent().round() as u32,
            current_time: self.current_time.max(0.0).round() as u64,
            duration: self.duration.max(0.0).round() as u64,
        }
    }

    /// e.g. `0:30 of 2:00 (25% played)`.
    pub fn progress_text(&self) -> String {
        if self.duration == 0.0 {
            return "Audio not loaded".to_string();
        }

        format!(
            "{} of {} ({}% played)",
            format_clock(self.current_time),
            format_clock(self.duration),
            self.played_percent().round() as u32
        )
    }

    pub fn status_text(&self) -> &'static str {
        if self.is_loading {
            "Loading audio"
        } else if self.has_error {
            "Error loading audio"
        } else if self.is_paused {
            "Audio paused"
        } else {
            "Audio playing"
        }
    }
}

/// `M:SS` with whole seconds truncated.
fn format_clock(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
