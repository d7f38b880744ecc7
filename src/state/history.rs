//! Append-only history of everything the user has spoken
//!
//! One line per entry: `[YYYY-MM-DD HH:MM:SS] text`.

use crate::Result;
use chrono::{DateTime, Local};
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Shown instead of history when there is no log file yet
pub const NO_HISTORY: &str = "No previous logs found.";

const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";

/// Format one history line
///
/// Line breaks in `text` become spaces so every entry stays on one line.
pub fn format_entry(at: DateTime<Local>, text: &str) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    format!("{} {}", at.format(TIMESTAMP_FORMAT), flat)
}

/// File-backed interaction log
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry and return the line as written
    pub fn append(&self, at: DateTime<Local>, text: &str) -> Result<String> {
        let entry = format_entry(at, text);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry)?;
        debug!("Logged: {}", entry);
        Ok(entry)
    }

    /// The last `n` lines, oldest first
    ///
    /// `None` if the log file does not exist yet.
    pub fn tail(&self, n: usize) -> Result<Option<Vec<String>>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(Some(lines[start..].iter().map(|l| l.to_string()).collect()))
    }

    /// Text for the history view at startup
    pub fn display_tail(&self, n: usize) -> String {
        match self.tail(n) {
            Ok(Some(lines)) => lines.join("\n"),
            Ok(None) => NO_HISTORY.to_string(),
            Err(e) => {
                log::warn!("Could not read history {:?}: {}", self.path, e);
                NO_HISTORY.to_string()
            }
        }
    }
}
