//! Speech synthesis: the model, its backends and the request dispatcher

pub mod backends;
pub mod dispatcher;
pub mod model;

pub use dispatcher::{
    Completion, DispatchPermit, SynthesisDispatcher, SynthesisRequest, SynthesisSettings,
};
pub use model::{ModelSlot, ModelStatus, SpeechModel};
