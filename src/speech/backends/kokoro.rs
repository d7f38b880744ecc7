//! Kokoro ONNX model behind a helper process
//!
//! The model runs in `scripts/kokoro_bridge.py`, which wraps `kokoro_onnx`.
//! We talk to it with one JSON object per line on stdin/stdout. Float
//! tensors travel as base64 of little-endian `f32`.
//!
//! Requests:
//! - `{"action": "voice", "name": ...}` returns `shape` and `data`
//! - `{"action": "synthesize", "text", "shape", "style", "speed", "lang"}`
//!   returns `audio` and `sample_rate`
//! - `{"action": "shutdown"}`
//!
//! Every reply carries `status` (`"ok"` or `"error"`) and `error` on failure.

use crate::audio::AudioBuffer;
use crate::speech::model::SpeechModel;
use crate::voice::VoiceEmbedding;
use crate::{PhoenixError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// How long the helper gets to exit after a shutdown request
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// How to launch the helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub python: String,
    pub script: PathBuf,
    pub model_path: PathBuf,
    pub voices_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    status: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    shape: Option<Vec<usize>>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    audio: Option<String>,
    #[serde(default)]
    sample_rate: Option<u32>,
}

impl BridgeReply {
    fn into_ok(self) -> Result<Self> {
        if self.status == "ok" {
            Ok(self)
        } else {
            Err(PhoenixError::Synthesis(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}

struct BridgeProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl BridgeProcess {
    fn request(&mut self, cmd: &serde_json::Value) -> Result<BridgeReply> {
        let line = serde_json::to_string(cmd)?;
        writeln!(self.stdin, "{}", line)?;
        self.stdin.flush()?;

        let mut reply = String::new();
        if self.stdout.read_line(&mut reply)? == 0 {
            return Err(PhoenixError::Model(
                "Kokoro helper exited unexpectedly".to_string(),
            ));
        }
        Ok(serde_json::from_str(&reply)?)
    }
}

/// Kokoro model served by the helper process
///
/// The helper handles one request at a time, so concurrent synthesis
/// workers take turns on it. Voice styles are cached after first use.
pub struct KokoroBridge {
    process: Mutex<BridgeProcess>,
    voices: Mutex<HashMap<String, VoiceEmbedding>>,
}

impl KokoroBridge {
    /// Start the helper and wait until it has loaded the model
    pub fn spawn(config: &BridgeConfig) -> Result<Self> {
        for path in [&config.model_path, &config.voices_path, &config.script] {
            if !path.exists() {
                return Err(PhoenixError::Model(format!(
                    "Model file not found: {}",
                    path.display()
                )));
            }
        }

        info!(
            "Starting Kokoro helper: {} {}",
            config.python,
            config.script.display()
        );
        let mut child = Command::new(&config.python)
            .arg(&config.script)
            .arg(&config.model_path)
            .arg(&config.voices_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                PhoenixError::Model(format!("Failed to spawn {}: {}", config.python, e))
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            reap(&mut child, Duration::ZERO);
            return Err(PhoenixError::Model(
                "Kokoro helper has no stdio pipes".to_string(),
            ));
        };
        let mut stdout = BufReader::new(stdout);

        if let Err(e) = wait_ready(&mut stdout) {
            reap(&mut child, Duration::ZERO);
            return Err(e);
        }

        info!("Kokoro model loaded");
        Ok(Self {
            process: Mutex::new(BridgeProcess {
                child,
                stdin,
                stdout,
            }),
            voices: Mutex::new(HashMap::new()),
        })
    }

    /// Send one command and read its reply, whatever its status
    fn exchange(&self, cmd: &serde_json::Value) -> Result<BridgeReply> {
        let mut process = self
            .process
            .lock()
            .map_err(|_| PhoenixError::Model("Kokoro helper lock poisoned".to_string()))?;
        process.request(cmd)
    }

    fn request(&self, cmd: &serde_json::Value) -> Result<BridgeReply> {
        self.exchange(cmd)?.into_ok()
    }

    fn cached_voice(&self, voice: &str) -> Option<VoiceEmbedding> {
        self.voices.lock().ok()?.get(voice).cloned()
    }
}

impl SpeechModel for KokoroBridge {
    fn embedding_for(&self, voice: &str) -> Result<VoiceEmbedding> {
        if let Some(embedding) = self.cached_voice(voice) {
            return Ok(embedding);
        }

        debug!("Fetching voice style {}", voice);
        let reply = self.exchange(&serde_json::json!({ "action": "voice", "name": voice }))?;
        let embedding = voice_from_reply(voice, reply)?;

        if let Ok(mut voices) = self.voices.lock() {
            voices.insert(voice.to_string(), embedding.clone());
        }
        Ok(embedding)
    }

    fn synthesize(
        &self,
        text: &str,
        embedding: &VoiceEmbedding,
        speed: f32,
        language: &str,
    ) -> Result<AudioBuffer> {
        let reply = self.request(&serde_json::json!({
            "action": "synthesize",
            "text": text,
            "shape": embedding.shape(),
            "style": encode_f32(embedding.as_slice()),
            "speed": speed,
            "lang": language,
        }))?;

        let audio = reply
            .audio
            .ok_or_else(|| PhoenixError::Synthesis("No audio in response".to_string()))?;
        let sample_rate = reply
            .sample_rate
            .ok_or_else(|| PhoenixError::Synthesis("No sample rate in response".to_string()))?;

        Ok(AudioBuffer::new(decode_f32(&audio)?, sample_rate))
    }
}

impl Drop for KokoroBridge {
    fn drop(&mut self) {
        let process = match self.process.get_mut() {
            Ok(p) => p,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(process.stdin, "{}", serde_json::json!({ "action": "shutdown" }));
        let _ = process.stdin.flush();
        reap(&mut process.child, SHUTDOWN_GRACE);
    }
}

/// Give the helper `grace` to exit on its own, then kill it
///
/// Always waits on the child afterwards so no zombie is left behind.
fn reap(child: &mut Child, grace: Duration) {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Kokoro helper exited: {}", status);
                return;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(20)),
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to poll Kokoro helper: {}", e);
                break;
            }
        }
    }

    if !grace.is_zero() {
        warn!("Kokoro helper did not exit within {:?}, killing it", grace);
    }
    let _ = child.kill();
    if let Err(e) = child.wait() {
        warn!("Failed to wait for Kokoro helper: {}", e);
    }
}

/// Style for `voice` out of a `voice` reply
///
/// An error reply means the helper does not know the voice. A malformed ok
/// reply is a model problem.
fn voice_from_reply(voice: &str, reply: BridgeReply) -> Result<VoiceEmbedding> {
    let reply = reply
        .into_ok()
        .map_err(|e| PhoenixError::UnknownVoice(format!("{}: {}", voice, e)))?;

    let shape = reply
        .shape
        .ok_or_else(|| PhoenixError::Model("voice reply has no shape".to_string()))?;
    let data = reply
        .data
        .ok_or_else(|| PhoenixError::Model("voice reply has no data".to_string()))?;
    VoiceEmbedding::new(shape, decode_f32(&data)?)
}

/// Block until the helper reports that the model is loaded
fn wait_ready(stdout: &mut BufReader<ChildStdout>) -> Result<()> {
    let mut line = String::new();
    if stdout.read_line(&mut line)? == 0 {
        return Err(PhoenixError::Model(
            "Kokoro helper exited during startup".to_string(),
        ));
    }

    let ready: BridgeReply = serde_json::from_str(&line)
        .map_err(|e| PhoenixError::Model(format!("Kokoro helper did not start: {}", e)))?;
    let ready = ready
        .into_ok()
        .map_err(|e| PhoenixError::Model(e.to_string()))?;
    if ready.action.as_deref() != Some("ready") {
        return Err(PhoenixError::Model(
            "Kokoro helper did not signal ready".to_string(),
        ));
    }
    Ok(())
}

/// Base64 of little-endian `f32` values
pub fn encode_f32(values: &[f32]) -> String {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    STANDARD.encode(bytes)
}

/// Inverse of [`encode_f32`]
pub fn decode_f32(encoded: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| PhoenixError::Model(format!("Base64 decode error: {}", e)))?;
    if bytes.len() % 4 != 0 {
        return Err(PhoenixError::Model(format!(
            "float payload of {} bytes is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
