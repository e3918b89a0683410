pub mod config;
pub mod error;
pub mod loader;
pub mod playback;
pub mod session;
pub mod types;
pub mod waveform;

pub use config::WaveConfig;
pub use error::{LoadError, WaveformError};
pub use loader::{load_audio, AudioFetcher, AudioSource, Decoder, Fetcher, LoadedAudio, SymphoniaDecoder};
pub use playback::{Key, KeyOutcome, MediaClock, PlaybackController, PlaybackState, SoftwareClock};
pub use session::WaveSession;
pub use types::PcmBuffer;
pub use waveform::{extract, Envelope};
