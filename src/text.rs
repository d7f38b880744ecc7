//! Input text cleanup
//!
//! Everything the user types goes through [`sanitize`] before it is logged
//! or handed to the model. Only word characters, whitespace and the
//! punctuation `. , ! ? " '` survive.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters the synthesizer is never given
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\w\s.,!?"']"#).expect("static regex is valid"));

/// Strip characters the model should never see
///
/// The input is trimmed, disallowed characters are removed, and the
/// result is trimmed again so that `"<>  hi"` does not keep a leading gap.
pub fn sanitize(text: &str) -> String {
    DISALLOWED
        .replace_all(text.trim(), "")
        .trim()
        .to_string()
}

/// One unit of submitted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    text: String,
    requested_at: DateTime<Local>,
}

impl Utterance {
    /// Sanitize raw input; `None` if nothing speakable is left
    pub fn new(raw: &str) -> Option<Self> {
        Self::at(raw, Local::now())
    }

    /// Same as [`Utterance::new`] with an explicit timestamp
    pub fn at(raw: &str, requested_at: DateTime<Local>) -> Option<Self> {
        let text = sanitize(raw);
        if text.is_empty() {
            return None;
        }
        Some(Self { text, requested_at })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn requested_at(&self) -> DateTime<Local> {
        self.requested_at
    }
}
