//! Error types for the visage pipeline

use thiserror::Error;

/// Result type alias for visage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the visage pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing or invalid setting)
    #[error("configuration error: {0}")]
    Config(String),

    /// Required file or directory does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Capture or playback hardware unavailable
    #[error("audio device error: {0}")]
    Device(String),

    /// Playback failed (malformed file, stream error)
    #[error("playback error: {0}")]
    Playback(String),

    /// Speech-to-text error
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Text-to-speech error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Lip-sync renderer subprocess error
    #[error("render error: {0}")]
    Render(String),

    /// Blendshape validation or extraction error
    #[error("blendshape error: {0}")]
    Blendshape(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
