//! Application configuration
//!
//! Where the data files live and how the synthesis pipeline is sized.
//! Built once at startup and handed to the controller; nothing here is
//! written back to disk.

use crate::speech::backends::BridgeConfig;
use crate::speech::SynthesisSettings;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Input history file
pub const LOG_FILE: &str = "tts_log.txt";
/// One voice name per line
pub const VOICES_FILE: &str = "voices-list.txt";
/// Saved voice and blend selection
pub const PREFERENCES_FILE: &str = "config.json";
pub const MODEL_FILE: &str = "kokoro-v1.0.onnx";
pub const VOICE_BANK_FILE: &str = "voices-v1.0.bin";
pub const BRIDGE_SCRIPT: &str = "scripts/kokoro_bridge.py";

/// Lines of history shown at startup
pub const HISTORY_TAIL: usize = 50;

/// Everything the app needs to know before it starts
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory the data files are resolved against
    pub data_dir: PathBuf,
    pub log_path: PathBuf,
    pub voices_path: PathBuf,
    pub preferences_path: PathBuf,
    pub model_path: PathBuf,
    pub voice_bank_path: PathBuf,
    /// Model helper script; not tied to `data_dir` outside of [`in_dir`](Self::in_dir)
    pub bridge_script: PathBuf,
    /// Interpreter used to run the bridge script
    pub python: String,
    pub history_tail: usize,
    pub synthesis: SynthesisSettings,
}

impl AppConfig {
    /// Default layout with every file inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_dir: dir.to_path_buf(),
            log_path: dir.join(LOG_FILE),
            voices_path: dir.join(VOICES_FILE),
            preferences_path: dir.join(PREFERENCES_FILE),
            model_path: dir.join(MODEL_FILE),
            voice_bank_path: dir.join(VOICE_BANK_FILE),
            bridge_script: dir.join(BRIDGE_SCRIPT),
            python: "python3".to_string(),
            history_tail: HISTORY_TAIL,
            synthesis: SynthesisSettings::default(),
        }
    }

    /// Working directory layout, adjusted by environment variables
    ///
    /// - `PHOENIX_TTS_HOME`: data directory (default: current directory)
    /// - `PHOENIX_TTS_BRIDGE`: model helper script (default: found next to
    ///   the executable, then in the current directory, then in the data
    ///   directory)
    /// - `PHOENIX_TTS_PYTHON`: interpreter for the model helper
    /// - `PHOENIX_TTS_WORKERS`: number of synthesis workers
    pub fn from_env() -> Self {
        let dir = std::env::var_os("PHOENIX_TTS_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self::in_dir(&dir);

        config.bridge_script = match std::env::var_os("PHOENIX_TTS_BRIDGE") {
            Some(script) if !script.is_empty() => PathBuf::from(script),
            _ => {
                let mut candidates = Vec::new();
                if let Some(exe_dir) = std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
                {
                    candidates.push(exe_dir.join(BRIDGE_SCRIPT));
                }
                candidates.push(PathBuf::from(BRIDGE_SCRIPT));
                candidates.push(dir.join(BRIDGE_SCRIPT));
                find_bridge_script(&candidates)
            }
        };

        if let Ok(python) = std::env::var("PHOENIX_TTS_PYTHON") {
            if !python.trim().is_empty() {
                config.python = python;
            }
        }

        if let Ok(workers) = std::env::var("PHOENIX_TTS_WORKERS") {
            match workers.parse::<usize>() {
                Ok(n) if n > 0 => config.synthesis.workers = n,
                _ => warn!("Ignoring invalid PHOENIX_TTS_WORKERS={:?}", workers),
            }
        }

        debug!("Configuration: {:?}", config);
        config
    }

    /// Launch settings for the Kokoro helper
    pub fn bridge(&self) -> BridgeConfig {
        BridgeConfig {
            python: self.python.clone(),
            script: self.bridge_script.clone(),
            model_path: self.model_path.clone(),
            voices_path: self.voice_bank_path.clone(),
        }
    }
}

/// First candidate that exists, or the first candidate if none do
///
/// The fallback keeps the "not found" error pointing at the preferred spot.
pub fn find_bridge_script(candidates: &[PathBuf]) -> PathBuf {
    candidates
        .iter()
        .find(|p| p.is_file())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_else(|| PathBuf::from(BRIDGE_SCRIPT))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_layout() {
        let config = AppConfig::in_dir("/data");
        assert_eq!(config.log_path, PathBuf::from("/data/tts_log.txt"));
        assert_eq!(config.preferences_path, PathBuf::from("/data/config.json"));
        assert_eq!(config.voices_path, PathBuf::from("/data/voices-list.txt"));
        assert_eq!(config.history_tail, 50);
        assert_eq!(config.synthesis.speed, 1.0);
        assert_eq!(config.synthesis.language, "en-us");
    }

    #[test]
    fn test_bridge_paths() {
        let bridge = AppConfig::in_dir("/data").bridge();
        assert_eq!(bridge.model_path, PathBuf::from("/data/kokoro-v1.0.onnx"));
        assert_eq!(bridge.voices_path, PathBuf::from("/data/voices-v1.0.bin"));
    }

    #[test]
    fn test_bridge_script_found_outside_data_dir() {
        let install = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let script = install.path().join(BRIDGE_SCRIPT);
        std::fs::create_dir_all(script.parent().unwrap()).unwrap();
        std::fs::write(&script, "").unwrap();

        // Data directory has no scripts/ at all
        let found = find_bridge_script(&[
            data.path().join(BRIDGE_SCRIPT),
            script.clone(),
        ]);
        assert_eq!(found, script);
    }

    #[test]
    fn test_bridge_script_falls_back_to_first_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a").join(BRIDGE_SCRIPT);
        let second = dir.path().join("b").join(BRIDGE_SCRIPT);
        assert_eq!(find_bridge_script(&[first.clone(), second]), first);
        assert_eq!(find_bridge_script(&[]), PathBuf::from(BRIDGE_SCRIPT));
    }
}
