//! Phoenix TTS - type text, hear it spoken
//!
//! Speaks typed text with a blend of two Kokoro voices. Synthesis runs on
//! a small worker pool and finished audio is played back one utterance at
//! a time, in the order it was submitted.

pub mod audio;
pub mod controller;
pub mod error;
pub mod speech;
pub mod state;
pub mod text;
pub mod voice;

pub use controller::{Controller, PipelineStatus};
pub use error::{PhoenixError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "phoenix-tts";
