//! Available voice names

use crate::Result;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::Path;

/// Ordered list of voice names the user can pick from
///
/// Loaded once at startup from a plain text file with one name per line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceCatalog {
    voices: Vec<String>,
}

impl VoiceCatalog {
    /// Build a catalog from names; blank entries are dropped
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let voices = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { voices }
    }

    /// Parse the voice list file format
    pub fn parse(contents: &str) -> Self {
        Self::new(contents.lines())
    }

    /// Load from disk
    ///
    /// A missing file gives an empty catalog. Other read errors are returned.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading voice list from {:?}", path);
        match fs::read_to_string(path) {
            Ok(contents) => {
                let catalog = Self::parse(&contents);
                info!("Loaded {} voices", catalog.len());
                Ok(catalog)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Voice list {:?} not found, no voices available", path);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn voices(&self) -> &[String] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.voices.iter().any(|v| v == name)
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.voices.get(idx).map(String::as_str)
    }

    /// Default pick for the first voice slot
    pub fn default_voice1(&self) -> Option<&str> {
        self.get(0)
    }

    /// Default pick for the second voice slot
    pub fn default_voice2(&self) -> Option<&str> {
        self.get(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_blank_lines() {
        let catalog = VoiceCatalog::parse("af_heart\n\n  am_adam  \n\t\nbf_emma\n");
        assert_eq!(catalog.voices(), &["af_heart", "am_adam", "bf_emma"]);
        assert_eq!(catalog.default_voice1(), Some("af_heart"));
        assert_eq!(catalog.default_voice2(), Some("am_adam"));
    }

    #[test]
    fn test_single_voice_has_no_second_default() {
        let catalog = VoiceCatalog::parse("af_heart");
        assert_eq!(catalog.default_voice2(), None);
        assert!(catalog.contains("af_heart"));
        assert!(!catalog.contains("af"));
    }
}
