//! Error types for Phoenix TTS

use std::io;
use thiserror::Error;

/// Main error type for Phoenix TTS
#[derive(Error, Debug)]
pub enum PhoenixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Speech model error: {0}")]
    Model(String),

    /// The background model load has not finished (or failed).
    /// Retrying later may succeed.
    #[error("Speech model is not ready yet")]
    ModelNotReady,

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Playback error: {0}")]
    Playback(String),

    /// Too many synthesis requests are outstanding
    #[error("Synthesis queue is full ({0} requests pending)")]
    Busy(usize),

    #[error("Shutting down")]
    ShuttingDown,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PhoenixError {
    /// Whether the same request could succeed if submitted again later
    pub fn is_transient(&self) -> bool {
        matches!(self, PhoenixError::ModelNotReady | PhoenixError::Busy(_))
    }
}

/// Result type alias for Phoenix TTS operations
pub type Result<T> = std::result::Result<T, PhoenixError>;

impl From<String> for PhoenixError {
    fn from(s: String) -> Self {
        PhoenixError::Other(s)
    }
}

impl From<&str> for PhoenixError {
    fn from(s: &str) -> Self {
        PhoenixError::Other(s.to_string())
    }
}
