//! Preferences, history and voice list files
//!
//! Missing or broken files must never stop the app from starting.

use chrono::{Local, TimeZone};
use phoenix_tts::state::history::NO_HISTORY;
use phoenix_tts::state::{InteractionLog, Preferences, PreferencesStore};
use phoenix_tts::voice::VoiceCatalog;
use std::fs;

fn catalog() -> VoiceCatalog {
    VoiceCatalog::new(["af_heart", "am_adam", "bf_emma"])
}

#[test]
fn test_preferences_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = PreferencesStore::new(dir.path().join("config.json"));

    let prefs = Preferences {
        voice1: "bf_emma".to_string(),
        voice2: "af_heart".to_string(),
        blend_percent: 70,
    };
    store.save(&prefs).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["voice1"], "bf_emma");
    assert_eq!(json["voice2"], "af_heart");
    assert_eq!(json["blend"], 70);
    assert!(raw.contains("\n    \"voice1\""), "four-space indent: {}", raw);

    assert_eq!(store.load(&catalog()), prefs);
}

#[test]
fn test_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = PreferencesStore::new(dir.path().join("config.json"));
    let mut prefs = Preferences::defaults_for(&catalog());

    prefs.set_blend(10);
    store.save(&prefs).unwrap();
    prefs.set_blend(90);
    store.save(&prefs).unwrap();

    assert_eq!(store.load(&catalog()).blend_percent, 90);
}

#[test]
fn test_missing_or_malformed_preferences_use_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = PreferencesStore::new(dir.path().join("config.json"));
    let defaults = Preferences::defaults_for(&catalog());

    assert_eq!(store.load(&catalog()), defaults);

    fs::write(store.path(), "{ not json").unwrap();
    assert_eq!(store.load(&catalog()), defaults);

    fs::write(store.path(), r#"{"voice1": 3, "blend": "loud"}"#).unwrap();
    assert_eq!(store.load(&catalog()), defaults);

    fs::write(store.path(), r#"{"blend": 20}"#).unwrap();
    let prefs = store.load(&catalog());
    assert_eq!(prefs.voice1, "af_heart");
    assert_eq!(prefs.blend_percent, 20);
}

#[test]
fn test_history_append_and_tail() {
    let dir = tempfile::tempdir().unwrap();
    let log = InteractionLog::new(dir.path().join("tts_log.txt"));

    assert_eq!(log.tail(50).unwrap(), None);
    assert_eq!(log.display_tail(50), NO_HISTORY);

    let at = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    for i in 0..60 {
        log.append(at, &format!("line {}", i)).unwrap();
    }

    let tail = log.tail(50).unwrap().unwrap();
    assert_eq!(tail.len(), 50);
    assert_eq!(tail[0], "[2025-01-02 03:04:05] line 10");
    assert_eq!(tail[49], "[2025-01-02 03:04:05] line 59");

    let raw = fs::read_to_string(log.path()).unwrap();
    assert_eq!(raw.lines().count(), 60);
}

#[test]
fn test_voice_list_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voices-list.txt");

    assert!(VoiceCatalog::load(&path).unwrap().is_empty());

    fs::write(&path, "af_heart\r\n\r\nam_adam\n   \n").unwrap();
    let catalog = VoiceCatalog::load(&path).unwrap();
    assert_eq!(catalog.voices(), &["af_heart", "am_adam"]);
}
