//! Audio output device
//!
//! The playback queue is the only caller, and it never plays two buffers
//! at once. Implementations may therefore assume calls are serialized.

use crate::audio::AudioBuffer;
use crate::{PhoenixError, Result};
use log::debug;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};

/// Something that can play a PCM buffer to completion
pub trait AudioOutput: Send {
    /// Play `buffer`, blocking until the device has finished with it
    fn play(&mut self, buffer: &AudioBuffer) -> Result<()>;
}

/// Default system output through rodio
///
/// rodio's `OutputStream` is not `Send`, so the stream is opened on the
/// calling thread for every buffer. The queue's worker is the only thread
/// that ever calls this.
#[derive(Debug, Default)]
pub struct RodioOutput;

impl RodioOutput {
    pub fn new() -> Self {
        Self
    }
}

impl AudioOutput for RodioOutput {
    fn play(&mut self, buffer: &AudioBuffer) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        if buffer.sample_rate() == 0 {
            return Err(PhoenixError::Playback(
                "buffer has a sample rate of 0 Hz".to_string(),
            ));
        }

        let (_stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| PhoenixError::Playback(format!("Failed to open output stream: {}", e)))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| PhoenixError::Playback(format!("Failed to create sink: {}", e)))?;

        debug!(
            "Playing {} samples at {} Hz ({:?})",
            buffer.len(),
            buffer.sample_rate(),
            buffer.duration()
        );

        sink.append(SamplesBuffer::new(
            1,
            buffer.sample_rate(),
            buffer.samples().to_vec(),
        ));
        sink.sleep_until_end();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sample_rate_rejected() {
        let mut output = RodioOutput::new();
        let err = output.play(&AudioBuffer::new(vec![0.5], 0)).unwrap_err();
        assert!(matches!(err, PhoenixError::Playback(_)));
    }
}
