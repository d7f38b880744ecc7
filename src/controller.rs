//! Glue between the front end and the speech pipeline
//!
//! The controller lives on the interaction thread. It owns the user's
//! live voice selection, turns submitted text into synthesis requests and
//! routes the resulting audio to the playback queue. Nothing it does
//! blocks on synthesis or playback.

use crate::audio::{AudioOutput, PlaybackQueue};
use crate::speech::{ModelSlot, ModelStatus, SynthesisDispatcher, SynthesisRequest};
use crate::state::{AppConfig, InteractionLog, Preferences, PreferencesStore};
use crate::text::Utterance;
use crate::voice::VoiceCatalog;
use crate::{PhoenixError, Result};
use log::{debug, info, warn};
use std::sync::Arc;

/// Snapshot of the pipeline for status display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    pub model: ModelStatus,
    pub synthesizing: usize,
    pub played: usize,
    pub playback_failures: usize,
}

pub struct Controller {
    catalog: VoiceCatalog,
    preferences: Preferences,
    store: PreferencesStore,
    history: InteractionLog,
    history_tail: usize,
    model: Arc<ModelSlot>,
    dispatcher: SynthesisDispatcher,
    playback: PlaybackQueue,
    shut_down: bool,
}

impl Controller {
    /// Load voices and preferences and start the pipeline
    ///
    /// The model may still be loading; submissions fail with
    /// [`PhoenixError::ModelNotReady`] until it is installed in `model`.
    pub fn new(
        config: &AppConfig,
        model: Arc<ModelSlot>,
        output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        let catalog = VoiceCatalog::load(&config.voices_path).unwrap_or_else(|e| {
            warn!("Could not read voice list {:?}: {}", config.voices_path, e);
            VoiceCatalog::default()
        });

        let store = PreferencesStore::new(&config.preferences_path);
        let preferences = store.load(&catalog);
        info!(
            "Voices: {} + {} at {}%",
            preferences.voice1, preferences.voice2, preferences.blend_percent
        );

        let playback = PlaybackQueue::start(output)?;
        let dispatcher = SynthesisDispatcher::start(Arc::clone(&model), config.synthesis.clone())?;

        Ok(Self {
            catalog,
            preferences,
            store,
            history: InteractionLog::new(&config.log_path),
            history_tail: config.history_tail,
            model,
            dispatcher,
            playback,
            shut_down: false,
        })
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Recent history for display at startup
    pub fn history(&self) -> String {
        self.history.display_tail(self.history_tail)
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            model: self.model.status(),
            synthesizing: self.dispatcher.outstanding(),
            played: self.playback.played(),
            playback_failures: self.playback.failed(),
        }
    }

    /// Speak `raw` with the current selection
    ///
    /// Returns the history line that was written, or `None` if nothing
    /// speakable was left after sanitizing. Either the text is both
    /// logged and dispatched, or neither happens.
    pub fn submit(&self, raw: &str) -> Result<Option<String>> {
        let Some(utterance) = Utterance::new(raw) else {
            debug!("Ignoring empty submission");
            return Ok(None);
        };
        if self.shut_down {
            return Err(PhoenixError::ShuttingDown);
        }

        let request = SynthesisRequest {
            text: utterance.text().to_string(),
            voice1: self.checked_voice(&self.preferences.voice1)?,
            voice2: self.checked_voice(&self.preferences.voice2)?,
            blend_percent: self.preferences.blend_percent,
        };

        let permit = self.dispatcher.prepare()?;
        let entry = self
            .history
            .append(utterance.requested_at(), utterance.text())?;

        let ticket = self.playback.reserve();
        debug!("Dispatching {:?} as playback slot {}", request.text, ticket.seq());
        permit.dispatch(request, Box::new(move |buffer| ticket.fill(buffer)));

        Ok(Some(entry))
    }

    pub fn set_voice1(&mut self, name: &str) -> Result<()> {
        self.preferences.voice1 = self.checked_voice(name.trim())?;
        self.save_preferences()
    }

    pub fn set_voice2(&mut self, name: &str) -> Result<()> {
        self.preferences.voice2 = self.checked_voice(name.trim())?;
        self.save_preferences()
    }

    /// Set the weight of voice 1, clamped to 0-100
    pub fn set_blend(&mut self, percent: i64) -> Result<()> {
        self.preferences.set_blend(percent);
        self.save_preferences()
    }

    fn save_preferences(&self) -> Result<()> {
        self.store.save(&self.preferences)
    }

    fn checked_voice(&self, name: &str) -> Result<String> {
        let known = if self.catalog.is_empty() {
            !name.is_empty()
        } else {
            self.catalog.contains(name)
        };
        if known {
            Ok(name.to_string())
        } else {
            Err(PhoenixError::UnknownVoice(name.to_string()))
        }
    }

    /// Stop playback, then drain the synthesis workers
    ///
    /// Audio that finishes synthesizing after this point is discarded.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        info!("Controller shutting down");
        self.playback.stop();
        self.dispatcher.shutdown();
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
