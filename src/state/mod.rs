//! Persistent application state
//!
//! Startup configuration, the saved voice selection and the history of
//! spoken text.

pub mod config;
pub mod history;
pub mod preferences;

pub use config::AppConfig;
pub use history::InteractionLog;
pub use preferences::{Preferences, PreferencesStore};
