//! Voices: the catalog of names and the style vectors behind them

pub mod catalog;
pub mod embedding;

pub use catalog::VoiceCatalog;
pub use embedding::{blend_ratio, VoiceEmbedding};
