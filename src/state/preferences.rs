//! Saved voice and blend selection
//!
//! Stored as `{"voice1": ..., "voice2": ..., "blend": ...}`. Every change
//! is written straight away; the last write wins.

use crate::voice::VoiceCatalog;
use crate::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Blend used when nothing is saved
pub const DEFAULT_BLEND: u8 = 50;

/// The user's current voice selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub voice1: String,
    pub voice2: String,
    /// Weight of `voice1` in percent, 0-100
    #[serde(rename = "blend")]
    pub blend_percent: u8,
}

impl Preferences {
    /// Defaults for a catalog: its first two voices at an even blend
    pub fn defaults_for(catalog: &VoiceCatalog) -> Self {
        Self {
            voice1: catalog.default_voice1().unwrap_or_default().to_string(),
            voice2: catalog.default_voice2().unwrap_or_default().to_string(),
            blend_percent: DEFAULT_BLEND,
        }
    }

    /// Set the blend, clamped to 0-100
    pub fn set_blend(&mut self, percent: i64) {
        self.blend_percent = percent.clamp(0, 100) as u8;
    }
}

/// Raw file contents; every field optional so partial files still load
#[derive(Debug, Default, Deserialize)]
struct StoredPreferences {
    voice1: Option<String>,
    voice2: Option<String>,
    blend: Option<i64>,
}

impl StoredPreferences {
    /// Fill gaps from the catalog defaults
    ///
    /// A stored voice the catalog no longer offers is replaced by the
    /// default for that slot. An empty catalog accepts any name.
    fn resolve(self, catalog: &VoiceCatalog) -> Preferences {
        let defaults = Preferences::defaults_for(catalog);
        let known = |name: &String| catalog.is_empty() || catalog.contains(name);

        let mut prefs = Preferences {
            voice1: self.voice1.filter(known).unwrap_or(defaults.voice1),
            voice2: self.voice2.filter(known).unwrap_or(defaults.voice2),
            blend_percent: DEFAULT_BLEND,
        };
        if let Some(blend) = self.blend {
            prefs.set_blend(blend);
        }
        prefs
    }
}

/// File-backed preferences
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved preferences
    ///
    /// A missing, unreadable or malformed file gives the catalog defaults.
    pub fn load(&self, catalog: &VoiceCatalog) -> Preferences {
        debug!("Loading preferences from {:?}", self.path);
        let stored = match fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str::<StoredPreferences>(&contents) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!("Ignoring malformed preferences {:?}: {}", self.path, e);
                    StoredPreferences::default()
                }
            },
            Err(e) => {
                debug!("No saved preferences ({}), using defaults", e);
                StoredPreferences::default()
            }
        };
        stored.resolve(catalog)
    }

    /// Write preferences, replacing whatever was there
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        debug!("Saving preferences to {:?}", self.path);
        let mut json = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut json, formatter);
        prefs.serialize(&mut ser)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
