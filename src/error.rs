use thiserror::Error;

/// Failures of envelope extraction. Both are caller errors and never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaveformError {
    #[error("Audio buffer has no samples")]
    EmptyAudio,
    #[error("Invalid target sample count: {0}")]
    InvalidTargetSamples(usize),
}

/// Failures of the fetch → decode → extract pipeline.
///
/// Every variant collapses to `has_error = true` on the playback state; a
/// retry needs a fresh load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid audio source: {0}")]
    InvalidSource(String),
    #[error("Failed to fetch audio: {0}")]
    Fetch(String),
    #[error("Failed to decode audio: {0}")]
    Decode(String),
    #[error("Failed to extract waveform: {0}")]
    Waveform(#[from] WaveformError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}

impl From<symphonia::core::errors::Error> for LoadError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
