use serde::Serialize;

/// Decoded PCM audio held as separate channel arrays.
///
/// All channels share one frame count and sample rate. Samples are expected in
/// `[-1.0, 1.0]` but are not clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Build a buffer from per-channel sample arrays.
    ///
    /// Channels of unequal length are truncated to the shortest one.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        if channels.iter().any(|c| c.len() != frames) {
            log::warn!(
                "PcmBuffer: channel lengths differ, truncating to {} frames",
                frames
            );
            for channel in channels.iter_mut() {
                channel.truncate(frames);
            }
        }
        Self {
            channels,
            sample_rate,
        }
    }

    /// Deinterleave `samples` (frame-major) into `channel_count` arrays.
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        if channel_count == 0 {
            return Self::new(Vec::new(), sample_rate);
        }

        let frames = samples.len() / channel_count;
        let mut channels: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(frames))
            .collect();

        for frame in samples.chunks_exact(channel_count) {
            for (c, sample) in frame.iter().enumerate() {
                channels[c].push(*sample);
            }
        }

        Self::new(channels, sample_rate)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.frames() == 0
    }

    /// Length in seconds, 0 when the sample rate is unknown.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }
}
