//! Test doubles shared by the integration tests
#![allow(dead_code)]

use phoenix_tts::audio::{AudioBuffer, AudioOutput};
use phoenix_tts::speech::SpeechModel;
use phoenix_tts::voice::VoiceEmbedding;
use phoenix_tts::{PhoenixError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Buffer whose first sample identifies it
pub fn tagged(tag: f32) -> AudioBuffer {
    AudioBuffer::new(vec![tag], 24000)
}

/// Output device that records what it was asked to play
#[derive(Clone, Default)]
pub struct RecordingOutput {
    played: Arc<Mutex<Vec<Vec<f32>>>>,
    busy: Arc<AtomicBool>,
    overlapped: Arc<AtomicBool>,
    started: Arc<Mutex<usize>>,
    /// How long each play call blocks
    pub delay: Duration,
    /// Buffers whose first sample equals this fail to play
    pub fail_tag: Option<f32>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Samples of every buffer played, in play order
    pub fn played(&self) -> Vec<Vec<f32>> {
        self.played.lock().unwrap().clone()
    }

    /// First sample of every buffer played
    pub fn tags(&self) -> Vec<f32> {
        self.played()
            .iter()
            .map(|s| s.first().copied().unwrap_or(f32::NAN))
            .collect()
    }

    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }

    /// Whether two play calls ever ran at the same time
    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&mut self, buffer: &AudioBuffer) -> Result<()> {
        // Same contract as rodio's SamplesBuffer
        assert!(buffer.sample_rate() != 0, "sample rate must not be 0");

        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        *self.started.lock().unwrap() += 1;

        thread::sleep(self.delay);

        let result = if self.fail_tag.is_some() && buffer.samples().first() == self.fail_tag.as_ref() {
            Err(PhoenixError::Playback("device unplugged".to_string()))
        } else {
            self.played.lock().unwrap().push(buffer.samples().to_vec());
            Ok(())
        };

        self.busy.store(false, Ordering::SeqCst);
        result
    }
}

/// One call the fake model received
#[derive(Debug, Clone, PartialEq)]
pub struct SynthCall {
    pub text: String,
    pub style: Vec<f32>,
    pub speed: f32,
    pub language: String,
}

/// Model with fixed voices
///
/// Text containing `slow` takes 300ms, text containing `fail` errors, and
/// text containing `panic` panics. The returned samples are the blended
/// style followed by the text length, so tests can tell buffers apart.
#[derive(Default)]
pub struct FakeModel {
    voices: HashMap<String, Vec<f32>>,
    calls: Mutex<Vec<SynthCall>>,
}

impl FakeModel {
    pub fn new(voices: &[(&str, Vec<f32>)]) -> Self {
        Self {
            voices: voices
                .iter()
                .map(|(n, v)| (n.to_string(), v.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn alice_bob() -> Self {
        Self::new(&[("Alice", vec![1.0, 0.0, 2.0]), ("Bob", vec![0.0, 1.0, -2.0])])
    }

    pub fn calls(&self) -> Vec<SynthCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl SpeechModel for FakeModel {
    fn embedding_for(&self, voice: &str) -> Result<VoiceEmbedding> {
        self.voices
            .get(voice)
            .map(|v| VoiceEmbedding::from_vec(v.clone()))
            .ok_or_else(|| PhoenixError::UnknownVoice(voice.to_string()))
    }

    fn synthesize(
        &self,
        text: &str,
        embedding: &VoiceEmbedding,
        speed: f32,
        language: &str,
    ) -> Result<AudioBuffer> {
        self.calls.lock().unwrap().push(SynthCall {
            text: text.to_string(),
            style: embedding.as_slice().to_vec(),
            speed,
            language: language.to_string(),
        });

        if text.contains("slow") {
            thread::sleep(Duration::from_millis(300));
        }
        if text.contains("fail") {
            return Err(PhoenixError::Synthesis("model exploded".to_string()));
        }
        if text.contains("panic") {
            panic!("model panicked on purpose");
        }

        let mut samples = embedding.as_slice().to_vec();
        samples.push(text.len() as f32);
        Ok(AudioBuffer::new(samples, 24000))
    }
}
