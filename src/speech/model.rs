//! Speech model abstraction and its readiness gate
//!
//! Loading the model takes seconds, so it happens on a background thread
//! while the rest of the app is already usable. [`ModelSlot`] holds the
//! model once it exists; until then every lookup fails fast with
//! [`PhoenixError::ModelNotReady`] instead of waiting.

use crate::audio::AudioBuffer;
use crate::voice::VoiceEmbedding;
use crate::{PhoenixError, Result};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

/// Neural text-to-speech model
///
/// Implementations must be usable from several synthesis workers at once.
pub trait SpeechModel: Send + Sync {
    /// Style vector for a named voice; fails if the name is unknown
    fn embedding_for(&self, voice: &str) -> Result<VoiceEmbedding>;

    /// Synthesize `text` with the given style
    fn synthesize(
        &self,
        text: &str,
        embedding: &VoiceEmbedding,
        speed: f32,
        language: &str,
    ) -> Result<AudioBuffer>;
}

/// Where the background model load stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Failed(String),
}

/// Write-once holder for the model
#[derive(Default)]
pub struct ModelSlot {
    model: OnceCell<Arc<dyn SpeechModel>>,
    failure: Mutex<Option<String>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that is ready from the start
    pub fn ready(model: Arc<dyn SpeechModel>) -> Self {
        let slot = Self::new();
        slot.install(model);
        slot
    }

    /// Install the loaded model. Later installs are ignored.
    pub fn install(&self, model: Arc<dyn SpeechModel>) {
        if self.model.set(model).is_err() {
            info!("Speech model already installed, ignoring second install");
        }
    }

    /// Record that loading failed
    pub fn fail(&self, reason: impl Into<String>) {
        let reason = reason.into();
        error!("Speech model failed to load: {}", reason);
        if let Ok(mut failure) = self.failure.lock() {
            *failure = Some(reason);
        }
    }

    /// The model, or `ModelNotReady` without blocking
    pub fn get(&self) -> Result<Arc<dyn SpeechModel>> {
        self.model.get().cloned().ok_or(PhoenixError::ModelNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn status(&self) -> ModelStatus {
        if self.is_ready() {
            return ModelStatus::Ready;
        }
        match self.failure.lock() {
            Ok(failure) => match failure.as_ref() {
                Some(reason) => ModelStatus::Failed(reason.clone()),
                None => ModelStatus::Loading,
            },
            Err(_) => ModelStatus::Failed("model state lock poisoned".to_string()),
        }
    }

    /// Run `load` on a background thread and install its result
    pub fn load_in_background<F>(self: &Arc<Self>, load: F) -> Result<thread::JoinHandle<()>>
    where
        F: FnOnce() -> Result<Arc<dyn SpeechModel>> + Send + 'static,
    {
        let slot = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let started = Instant::now();
                match load() {
                    Ok(model) => {
                        slot.install(model);
                        info!("Speech model ready after {:?}", started.elapsed());
                    }
                    Err(e) => slot.fail(e.to_string()),
                }
            })?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl SpeechModel for Silent {
        fn embedding_for(&self, _voice: &str) -> Result<VoiceEmbedding> {
            Ok(VoiceEmbedding::from_vec(vec![0.0]))
        }

        fn synthesize(
            &self,
            _text: &str,
            _embedding: &VoiceEmbedding,
            _speed: f32,
            _language: &str,
        ) -> Result<AudioBuffer> {
            Ok(AudioBuffer::new(Vec::new(), 24000))
        }
    }

    #[test]
    fn test_slot_not_ready_fails_fast() {
        let slot = ModelSlot::new();
        assert!(matches!(slot.get(), Err(PhoenixError::ModelNotReady)));
        assert_eq!(slot.status(), ModelStatus::Loading);
    }

    #[test]
    fn test_background_load() {
        let slot = Arc::new(ModelSlot::new());
        let handle = slot
            .load_in_background(|| Ok(Arc::new(Silent) as Arc<dyn SpeechModel>))
            .unwrap();
        handle.join().unwrap();
        assert!(slot.is_ready());
        assert_eq!(slot.status(), ModelStatus::Ready);
    }

    #[test]
    fn test_background_load_failure() {
        let slot = Arc::new(ModelSlot::new());
        let handle = slot
            .load_in_background(|| Err(PhoenixError::Model("missing onnx file".into())))
            .unwrap();
        handle.join().unwrap();
        assert!(!slot.is_ready());
        assert!(matches!(slot.status(), ModelStatus::Failed(_)));
    }
}
