//! Audio buffers, the output device and the playback queue

pub mod buffer;
pub mod output;
pub mod queue;

pub use buffer::AudioBuffer;
pub use output::{AudioOutput, RodioOutput};
pub use queue::{PlaybackQueue, PlaybackTicket, QueueState};
