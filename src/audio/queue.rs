//! Serialized playback of synthesized audio
//!
//! A single long-lived worker thread owns the [`AudioOutput`] and plays one
//! buffer at a time. Producers never touch the device: they either
//! [`enqueue`](PlaybackQueue::enqueue) a finished buffer, or
//! [`reserve`](PlaybackQueue::reserve) a slot up front and fill it later.
//!
//! Entries play strictly in slot order. A slot reserved before a slow
//! synthesis holds back slots reserved after it, even if those finish
//! first. A ticket dropped without audio releases its slot so the queue
//! moves on.

use crate::audio::{AudioBuffer, AudioOutput};
use crate::Result;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Lifecycle of the queue itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Running,
    Stopping,
    Stopped,
}

impl QueueState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => QueueState::Running,
            1 => QueueState::Stopping,
            _ => QueueState::Stopped,
        }
    }
}

/// Messages from producers to the worker
#[derive(Debug)]
enum QueueMsg {
    Ready { seq: u64, buffer: AudioBuffer },
    Skip(u64),
}

/// State shared between the handle, tickets and the worker
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    played: AtomicUsize,
    failed: AtomicUsize,
}

impl Shared {
    fn state(&self) -> QueueState {
        QueueState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn is_running(&self) -> bool {
        self.state() == QueueState::Running
    }
}

/// A reserved position in the playback order
///
/// Fill it with [`fill`](PlaybackTicket::fill). Dropping an unfilled
/// ticket tells the queue to skip the position.
#[derive(Debug)]
pub struct PlaybackTicket {
    seq: u64,
    tx: Sender<QueueMsg>,
    shared: Arc<Shared>,
    done: bool,
}

impl PlaybackTicket {
    /// Position of this ticket in the playback order
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Hand over the audio for this slot. Never blocks.
    pub fn fill(mut self, buffer: AudioBuffer) {
        self.done = true;
        if !self.shared.is_running() {
            debug!("Discarding buffer {} - playback is shutting down", self.seq);
            return;
        }
        // The worker may already be gone; nothing to do about it then
        let _ = self.tx.send(QueueMsg::Ready {
            seq: self.seq,
            buffer,
        });
    }
}

impl Drop for PlaybackTicket {
    fn drop(&mut self) {
        if !self.done {
            debug!("Ticket {} released without audio", self.seq);
            let _ = self.tx.send(QueueMsg::Skip(self.seq));
        }
    }
}

/// Reorders out-of-order arrivals back into slot order
#[derive(Debug, Default)]
struct Reorder {
    next: u64,
    pending: BTreeMap<u64, Option<AudioBuffer>>,
}

impl Reorder {
    fn accept(&mut self, msg: QueueMsg) {
        match msg {
            QueueMsg::Ready { seq, buffer } => {
                self.pending.insert(seq, Some(buffer));
            }
            QueueMsg::Skip(seq) => {
                self.pending.insert(seq, None);
            }
        }
    }

    /// Next playable buffer, if its turn has come
    fn pop_ready(&mut self) -> Option<(u64, AudioBuffer)> {
        while let Some(slot) = self.pending.remove(&self.next) {
            let seq = self.next;
            self.next += 1;
            if let Some(buffer) = slot {
                return Some((seq, buffer));
            }
        }
        None
    }
}

/// FIFO playback queue with a dedicated worker thread
pub struct PlaybackQueue {
    tx: Sender<QueueMsg>,
    stop_tx: Sender<()>,
    next_seq: AtomicU64,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackQueue {
    /// Start the playback worker with the given output device
    pub fn start(output: Box<dyn AudioOutput>) -> Result<Self> {
        let (tx, rx) = unbounded::<QueueMsg>();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let shared = Arc::new(Shared {
            state: AtomicU8::new(QueueState::Running as u8),
            played: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || playback_worker(output, rx, stop_rx, worker_shared))?;

        info!("Playback queue started");

        Ok(Self {
            tx,
            stop_tx,
            next_seq: AtomicU64::new(0),
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Reserve the next position in the playback order
    pub fn reserve(&self) -> PlaybackTicket {
        PlaybackTicket {
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
            done: false,
        }
    }

    /// Append a finished buffer. Safe from any thread; never blocks.
    ///
    /// Ignored once [`stop`](Self::stop) has begun.
    pub fn enqueue(&self, buffer: AudioBuffer) {
        if !self.shared.is_running() {
            debug!("Ignoring enqueue after stop");
            return;
        }
        self.reserve().fill(buffer);
    }

    pub fn state(&self) -> QueueState {
        self.shared.state()
    }

    /// Buffers played successfully so far
    pub fn played(&self) -> usize {
        self.shared.played.load(Ordering::SeqCst)
    }

    /// Buffers the device failed to play
    pub fn failed(&self) -> usize {
        self.shared.failed.load(Ordering::SeqCst)
    }

    /// Stop the worker and wait for it to exit
    ///
    /// A buffer that is already playing finishes; anything still pending
    /// is dropped. Calling this more than once is harmless.
    pub fn stop(&self) {
        let handle = match self.worker.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(handle) = handle else {
            return;
        };

        info!("Stopping playback queue");
        self.shared
            .state
            .store(QueueState::Stopping as u8, Ordering::SeqCst);
        let _ = self.stop_tx.try_send(());

        if handle.join().is_err() {
            error!("Playback worker panicked");
        }

        self.shared
            .state
            .store(QueueState::Stopped as u8, Ordering::SeqCst);
        info!("Playback queue stopped");
    }
}

impl Drop for PlaybackQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn playback_worker(
    mut output: Box<dyn AudioOutput>,
    rx: Receiver<QueueMsg>,
    stop_rx: Receiver<()>,
    shared: Arc<Shared>,
) {
    debug!("Playback worker running");
    let mut reorder = Reorder::default();

    'outer: loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(rx) -> msg => match msg {
                Ok(msg) => reorder.accept(msg),
                // Every sender is gone; nothing more can arrive
                Err(_) => break,
            },
        }

        while let Some((seq, buffer)) = reorder.pop_ready() {
            if !shared.is_running() {
                break 'outer;
            }

            debug!("Playing buffer {}", seq);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| output.play(&buffer)));
            match outcome {
                Ok(Ok(())) => {
                    shared.played.fetch_add(1, Ordering::SeqCst);
                }
                Ok(Err(e)) => {
                    shared.failed.fetch_add(1, Ordering::SeqCst);
                    warn!("Playback of buffer {} failed: {}", seq, e);
                }
                Err(_) => {
                    shared.failed.fetch_add(1, Ordering::SeqCst);
                    warn!("Output device panicked on buffer {}", seq);
                }
            }
        }
    }

    let dropped = reorder.pending.values().filter(|b| b.is_some()).count();
    if dropped > 0 {
        info!("Dropped {} pending buffers on shutdown", dropped);
    }
    debug!("Playback worker exiting");
}
