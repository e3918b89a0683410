//! Playback synchronization
//!
//! The controller issues transport commands to a [`MediaClock`] and rebuilds
//! its view of position and paused state from the clock on every poll tick:
//! 1. Transport commands (play/pause/stop/seek) forwarded, never trusted
//! 2. Volume, rate and loop clamped and applied immediately
//! 3. Reconciliation against the clock on a fixed period ([`PollLoop`])

pub mod clock;
pub mod controller;
pub mod keyboard;
#[cfg(feature = "audio-output")]
pub mod output;
pub mod poll;
pub mod state;

pub use clock::{MediaClock, SoftwareClock};
pub use controller::PlaybackController;
pub use keyboard::{Key, KeyOutcome};
#[cfg(feature = "audio-output")]
pub use output::CpalClock;
pub use poll::PollLoop;
pub use state::{PlaybackState, RoundedProgress};
