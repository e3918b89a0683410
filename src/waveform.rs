//! Waveform envelope extraction
//!
//! Reduces a decoded PCM buffer to a fixed number of normalized peak values,
//! independent of track length and sample rate:
//! 1. Collapse channels to the mean absolute amplitude per frame
//! 2. Partition the frames into `N` contiguous windows
//! 3. Keep the peak magnitude of each window
//! 4. Normalize by the global peak (silence stays all zeros)

use std::ops::Range;

use serde::Serialize;

use crate::error::WaveformError;
use crate::types::PcmBuffer;

/// Default envelope resolution.
pub const DEFAULT_SAMPLES: usize = 70;

/// Fixed-length amplitude profile, every value in `[0.0, 1.0]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(Vec<f32>);

impl Envelope {
    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Largest value: 1.0 for any non-silent input, 0.0 for silence.
    pub fn peak(&self) -> f32 {
        self.0.iter().copied().fold(0.0, f32::max)
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// Build the `target_samples`-long envelope of `pcm`.
pub fn extract(pcm: &PcmBuffer, target_samples: usize) -> Result<Envelope, WaveformError> {
    if target_samples == 0 {
        return Err(WaveformError::InvalidTargetSamples(target_samples));
    }
    if pcm.is_empty() {
        return Err(WaveformError::EmptyAudio);
    }

    let magnitudes = collapse_channels(pcm);
    let total = magnitudes.len();

    let mut buckets: Vec<f32> = bucket_bounds(total, target_samples)
        .map(|window| {
            if window.is_empty() {
                // Fewer frames than buckets: sample the frame under the window
                magnitudes[window.start.min(total - 1)]
            } else {
                magnitudes[window].iter().copied().fold(0.0, f32::max)
            }
        })
        .collect();

    let peak = buckets.iter().copied().fold(0.0, f32::max);
    if peak > 0.0 {
        for value in buckets.iter_mut() {
            *value /= peak;
        }
    }

    Ok(Envelope(buckets))
}

/// Window boundaries over `[0, total)`: bucket `i` covers
/// `[i * total / n, (i + 1) * total / n)`.
///
/// The windows are contiguous, never overlap and end exactly at `total`; when
/// `total >= n` none of them is empty.
pub fn bucket_bounds(total: usize, n: usize) -> impl Iterator<Item = Range<usize>> {
    let boundary = move |i: usize| -> usize {
        if n == 0 {
            return 0;
        }
        ((i as u128 * total as u128) / n as u128) as usize
    };
    (0..n).map(move |i| boundary(i)..boundary(i + 1))
}

/// Mean absolute amplitude across channels for every frame.
fn collapse_channels(pcm: &PcmBuffer) -> Vec<f32> {
    let channel_count = pcm.channel_count();
    let mut magnitudes = vec![0.0f32; pcm.frames()];

    for channel in pcm.channels() {
        for (acc, sample) in magnitudes.iter_mut().zip(channel) {
            *acc += sample.abs();
        }
    }

    if channel_count > 1 {
        let divisor = channel_count as f32;
        for acc in magnitudes.iter_mut() {
            *acc /= divisor;
        }
    }

    magnitudes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| ((i as f32) * 0.37).sin() * (i % 17) as f32 / 17.0)
            .collect()
    }

    #[test]
    fn opposite_phase_stereo_normalizes_to_one() {
        let pcm = PcmBuffer::new(vec![vec![0.5; 1000], vec![-0.5; 1000]], 44100);
        let envelope = extract(&pcm, 10).unwrap();

        assert_eq!(envelope.len(), 10);
        assert!(envelope.values().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn returns_exactly_n_values_in_unit_range() {
        for (frames, n) in [(1000, 70), (1009, 10), (70, 70), (12345, 333)] {
            let pcm = PcmBuffer::new(vec![ramp(frames)], 48000);
            let envelope = extract(&pcm, n).unwrap();
            assert_eq!(envelope.len(), n);
            assert!(envelope.values().iter().all(|v| (0.0..=1.0).contains(v)));
            assert_eq!(envelope.peak(), 1.0, "frames={} n={}", frames, n);
        }
    }

    #[test]
    fn silence_stays_zero() {
        for frames in [1, 69, 70, 4410] {
            let pcm = PcmBuffer::new(vec![vec![0.0; frames], vec![0.0; frames]], 44100);
            let envelope = extract(&pcm, DEFAULT_SAMPLES).unwrap();
            assert_eq!(envelope.len(), DEFAULT_SAMPLES);
            assert!(envelope.values().iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn scaling_input_does_not_change_envelope() {
        let left = ramp(2000);
        let right: Vec<f32> = left.iter().rev().map(|s| s * 0.5).collect();
        let base = extract(&PcmBuffer::new(vec![left.clone(), right.clone()], 44100), 50).unwrap();

        // Non power-of-two factors round differently; allow a few ULPs
        for k in [0.1f32, 0.7, 1.3, 3.0, 0.25, 4.0] {
            let scaled = PcmBuffer::new(
                vec![
                    left.iter().map(|s| s * k).collect(),
                    right.iter().map(|s| s * k).collect(),
                ],
                44100,
            );
            let envelope = extract(&scaled, 50).unwrap();
            assert_eq!(envelope.len(), base.len());
            for (i, (a, b)) in envelope.values().iter().zip(base.values()).enumerate() {
                assert!((a - b).abs() <= 1e-6, "k={} bucket {}: {} vs {}", k, i, a, b);
            }
        }
    }

    #[test]
    fn keeps_transient_peaks() {
        let mut samples = vec![0.01f32; 1000];
        samples[455] = -0.9;
        let envelope = extract(&PcmBuffer::new(vec![samples], 8000), 10).unwrap();

        assert_eq!(envelope.values()[4], 1.0);
        assert!(envelope.values()[3] < 0.05);
    }

    #[test]
    fn windows_partition_the_series() {
        for total in [10usize, 11, 99, 1000, 1009, 44100] {
            for n in [1usize, 3, 7, 10] {
                if total < n {
                    continue;
                }
                let windows: Vec<Range<usize>> = bucket_bounds(total, n).collect();
                assert_eq!(windows.len(), n);
                assert_eq!(windows[0].start, 0);
                assert_eq!(windows[n - 1].end, total);
                for pair in windows.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
                assert!(windows.iter().all(|w| !w.is_empty()));
                let covered: usize = windows.iter().map(|w| w.len()).sum();
                assert_eq!(covered, total);
            }
        }
    }

    #[test]
    fn short_input_still_fills_every_bucket() {
        let pcm = PcmBuffer::new(vec![vec![0.2, 0.4, 0.8]], 8000);
        let envelope = extract(&pcm, 6).unwrap();
        assert_eq!(envelope.len(), 6);
        assert_eq!(envelope.peak(), 1.0);
    }

    #[test]
    fn rejects_empty_input_and_zero_target() {
        let pcm = PcmBuffer::new(vec![vec![0.5; 100]], 44100);
        assert_eq!(extract(&pcm, 0), Err(WaveformError::InvalidTargetSamples(0)));
        assert_eq!(
            extract(&PcmBuffer::new(Vec::new(), 44100), 10),
            Err(WaveformError::EmptyAudio)
        );
        assert_eq!(
            extract(&PcmBuffer::new(vec![Vec::new(), Vec::new()], 44100), 10),
            Err(WaveformError::EmptyAudio)
        );
    }
}
