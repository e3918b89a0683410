//! Player configuration
//!
//! Defaults for envelope resolution, layout and transport, optionally read from
//! a JSON settings file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::playback::state::{clamp_rate, clamp_volume};
use crate::waveform::DEFAULT_SAMPLES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaveConfig {
    /// Envelope resolution (number of buckets)
    pub samples: usize,
    /// Pixel gap per bucket; the rendered width is `samples * gap`
    pub gap: f64,
    /// Keyboard skip step in seconds
    pub skip_seconds: f64,
    pub volume: f32,
    pub playback_rate: f32,
    pub looping: bool,
    /// Reconciliation period of the poll loop
    pub poll_interval_ms: u64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            gap: 5.0,
            skip_seconds: 5.0,
            volume: 1.0,
            playback_rate: 1.0,
            looping: false,
            poll_interval_ms: 100,
        }
    }
}

impl WaveConfig {
    /// Read settings from `path`.
    ///
    /// A missing file gives the defaults; an unreadable or malformed one gives
    /// the defaults with a warning.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<WaveConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to parse settings {:?}, using defaults: {}", path, e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("Failed to read settings {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Width of the rendered waveform in pixels.
    pub fn width(&self) -> f64 {
        self.samples as f64 * self.gap
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// The configured volume after clamping, used for unmute.
    pub fn initial_volume(&self) -> f32 {
        clamp_volume(self.volume).unwrap_or(1.0)
    }

    pub fn initial_playback_rate(&self) -> f32 {
        clamp_rate(self.playback_rate).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let config = WaveConfig::default();
        assert_eq!(config.samples, 70);
        assert_eq!(config.skip_seconds, 5.0);
        assert_eq!(config.width(), 350.0);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = WaveConfig::load(&dir.path().join("nope.json"));
        assert_eq!(config, WaveConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "samples": 120, "skipSeconds": 10 }"#).unwrap();

        let config = WaveConfig::load(&path);
        assert_eq!(config.samples, 120);
        assert_eq!(config.skip_seconds, 10.0);
        assert_eq!(config.gap, 5.0);
        assert!(!config.looping);
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(WaveConfig::load(&path), WaveConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let config = WaveConfig {
            samples: 32,
            looping: true,
            volume: 0.4,
            ..WaveConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(WaveConfig::load(&path), config);
    }

    #[test]
    fn initial_values_are_clamped() {
        let config = WaveConfig {
            volume: 3.0,
            playback_rate: 0.0,
            ..WaveConfig::default()
        };
        assert_eq!(config.initial_volume(), 1.0);
        assert_eq!(config.initial_playback_rate(), 0.25);
    }
}
