//! Audio I/O
//!
//! Microphone capture and speaker playback for the conversational chain.
//! Both sides block until the operation completes; the pipeline never runs
//! two stages at once.

mod capture;
mod clip;
mod playback;

pub use capture::{AudioCapture, CAPTURE_SAMPLE_RATE, calculate_rms};
pub use clip::{AudioClip, samples_to_wav};
pub use playback::AudioPlayback;
