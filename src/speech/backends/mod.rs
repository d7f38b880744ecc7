//! Concrete speech model backends

// Kokoro ONNX model through a Python helper process
pub mod kokoro;

pub use kokoro::{BridgeConfig, KokoroBridge};
