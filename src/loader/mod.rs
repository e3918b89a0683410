//! Audio loading pipeline
//!
//! source reference -> [`AudioSource`] -> bytes ([`Fetcher`]) -> PCM ([`Decoder`])
//! -> [`Envelope`]. Decoding and extraction are CPU-bound and run on the
//! blocking pool.

pub mod decode;
pub mod fetch;
pub mod source;

use std::sync::Arc;

pub use decode::{Decoder, SymphoniaDecoder};
pub use fetch::{AudioFetcher, Fetcher};
pub use source::AudioSource;

use crate::error::LoadError;
use crate::types::PcmBuffer;
use crate::waveform::{self, Envelope};

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    pub pcm: Arc<PcmBuffer>,
    pub envelope: Envelope,
}

impl LoadedAudio {
    pub fn duration(&self) -> f64 {
        self.pcm.duration()
    }
}

/// Fetch, decode and extract an envelope of `samples` values from `src`.
pub async fn load_audio(
    src: &str,
    fetcher: &dyn Fetcher,
    decoder: Arc<dyn Decoder>,
    samples: usize,
) -> Result<LoadedAudio, LoadError> {
    let source = AudioSource::parse(src)?;
    let hint = source.extension();
    let bytes = fetcher.fetch(&source).await?;
    log::debug!("Loaded {} bytes from {}, decoding", bytes.len(), source);

    tokio::task::spawn_blocking(move || {
        let pcm = decoder.decode(bytes, hint.as_deref())?;
        let envelope = waveform::extract(&pcm, samples)?;
        Ok(LoadedAudio {
            pcm: Arc::new(pcm),
            envelope,
        })
    })
    .await
    .map_err(|e| LoadError::Decode(format!("Decode task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaveformError;
    use async_trait::async_trait;

    struct StaticFetcher(Vec<u8>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, _source: &AudioSource) -> Result<Vec<u8>, LoadError> {
            Ok(self.0.clone())
        }
    }

    /// Ignores the bytes and returns a fixed buffer.
    struct FixedDecoder(PcmBuffer);

    impl Decoder for FixedDecoder {
        fn decode(&self, _bytes: Vec<u8>, _hint: Option<&str>) -> Result<PcmBuffer, LoadError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn loads_envelope_of_requested_size() {
        let pcm = PcmBuffer::new(vec![vec![0.5; 1000], vec![-0.5; 1000]], 1000);
        let loaded = load_audio(
            "clip.wav",
            &StaticFetcher(vec![1, 2, 3]),
            Arc::new(FixedDecoder(pcm)),
            10,
        )
        .await
        .unwrap();

        assert_eq!(loaded.envelope.len(), 10);
        assert!(loaded.envelope.values().iter().all(|v| (v - 1.0).abs() < 1e-6));
        assert!((loaded.duration() - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn rejects_bad_source_before_fetching() {
        let err = load_audio(
            "javascript:alert(1)",
            &StaticFetcher(Vec::new()),
            Arc::new(SymphoniaDecoder),
            70,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidSource(_)));
    }

    #[tokio::test]
    async fn empty_decode_surfaces_waveform_error() {
        let err = load_audio(
            "clip.wav",
            &StaticFetcher(vec![0]),
            Arc::new(FixedDecoder(PcmBuffer::new(Vec::new(), 44100))),
            70,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LoadError::Waveform(WaveformError::EmptyAudio)));
    }
}
