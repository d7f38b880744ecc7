//! Off-thread synthesis requests
//!
//! A fixed pool of worker threads pulls jobs from a shared channel. The
//! number of jobs accepted but not yet finished is capped; callers learn
//! about a full pool immediately through [`PhoenixError::Busy`] rather
//! than blocking.
//!
//! Failures inside a job are logged and the job is dropped. Its completion
//! callback is dropped with it, never called with partial audio.

use crate::audio::AudioBuffer;
use crate::speech::model::{ModelSlot, SpeechModel};
use crate::{PhoenixError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Called with the finished audio of a successful request
pub type Completion = Box<dyn FnOnce(AudioBuffer) + Send + 'static>;

/// What to say and with which voices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice1: String,
    pub voice2: String,
    /// Weight of `voice1`, 0-100
    pub blend_percent: u8,
}

/// Parameters fixed for the lifetime of the dispatcher
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSettings {
    pub speed: f32,
    pub language: String,
    pub workers: usize,
    /// Maximum requests accepted but not yet finished
    pub capacity: usize,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            language: "en-us".to_string(),
            workers: 2,
            capacity: 8,
        }
    }
}

/// Holds one unit of dispatcher capacity until dropped
struct CapacityGuard(Arc<AtomicUsize>);

impl Drop for CapacityGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Job {
    request: SynthesisRequest,
    model: Arc<dyn SpeechModel>,
    on_complete: Completion,
    _capacity: CapacityGuard,
}

/// Permission to dispatch one request
///
/// Obtaining a permit checks everything that can fail on the caller's
/// side: shutdown, model readiness and capacity. Dispatching through the
/// permit then cannot fail. Dropping it unused gives the capacity back.
pub struct DispatchPermit<'a> {
    dispatcher: &'a SynthesisDispatcher,
    model: Arc<dyn SpeechModel>,
    capacity: CapacityGuard,
}

impl DispatchPermit<'_> {
    /// Queue the request for a worker
    pub fn dispatch(self, request: SynthesisRequest, on_complete: Completion) {
        let job = Job {
            request,
            model: self.model,
            on_complete,
            _capacity: self.capacity,
        };

        let sent = match self.dispatcher.tx.lock() {
            Ok(tx) => tx.as_ref().map(|tx| tx.send(job).is_ok()).unwrap_or(false),
            Err(_) => false,
        };
        if !sent {
            debug!("Dispatcher closed, request dropped");
        }
    }
}

/// Runs synthesis requests on a bounded worker pool
pub struct SynthesisDispatcher {
    model: Arc<ModelSlot>,
    settings: SynthesisSettings,
    tx: Mutex<Option<Sender<Job>>>,
    outstanding: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl SynthesisDispatcher {
    /// Spawn the worker pool
    pub fn start(model: Arc<ModelSlot>, settings: SynthesisSettings) -> Result<Self> {
        let (tx, rx) = unbounded::<Job>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let worker_count = settings.workers.max(1);

        let mut workers = Vec::with_capacity(worker_count);
        for idx in 0..worker_count {
            let rx = rx.clone();
            let cancelled = Arc::clone(&cancelled);
            let speed = settings.speed;
            let language = settings.language.clone();
            let handle = thread::Builder::new()
                .name(format!("synth-{}", idx))
                .spawn(move || synthesis_worker(rx, cancelled, speed, language))?;
            workers.push(handle);
        }

        info!(
            "Synthesis dispatcher started with {} workers (capacity {})",
            worker_count, settings.capacity
        );

        Ok(Self {
            model,
            settings,
            tx: Mutex::new(Some(tx)),
            outstanding: Arc::new(AtomicUsize::new(0)),
            cancelled,
            workers: Mutex::new(workers),
        })
    }

    pub fn settings(&self) -> &SynthesisSettings {
        &self.settings
    }

    /// Requests accepted but not yet finished
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Check that a request could be dispatched right now
    pub fn prepare(&self) -> Result<DispatchPermit<'_>> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(PhoenixError::ShuttingDown);
        }

        let model = self.model.get()?;

        let capacity = self.settings.capacity.max(1);
        self.outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < capacity).then_some(n + 1)
            })
            .map_err(PhoenixError::Busy)?;

        Ok(DispatchPermit {
            dispatcher: self,
            model,
            capacity: CapacityGuard(Arc::clone(&self.outstanding)),
        })
    }

    /// Prepare and dispatch in one step
    pub fn dispatch(&self, request: SynthesisRequest, on_complete: Completion) -> Result<()> {
        self.prepare()?.dispatch(request, on_complete);
        Ok(())
    }

    /// Stop accepting work and wait for the workers to exit
    ///
    /// Jobs not yet started are discarded. A job already inside the model
    /// runs to completion but its audio is thrown away.
    pub fn shutdown(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down synthesis dispatcher");

        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }

        let workers = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in workers {
            if handle.join().is_err() {
                error!("Synthesis worker panicked");
            }
        }
        info!("Synthesis dispatcher stopped");
    }
}

impl Drop for SynthesisDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn synthesis_worker(rx: Receiver<Job>, cancelled: Arc<AtomicBool>, speed: f32, language: String) {
    while let Ok(job) = rx.recv() {
        if cancelled.load(Ordering::SeqCst) {
            debug!("Discarding queued request during shutdown");
            continue;
        }

        let Job {
            request,
            model,
            on_complete,
            _capacity,
        } = job;

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            synthesize(model.as_ref(), &request, speed, &language)
        }));

        match outcome {
            Ok(Ok(buffer)) => {
                if cancelled.load(Ordering::SeqCst) {
                    debug!("Discarding audio finished after shutdown began");
                    continue;
                }
                debug!(
                    "Synthesized {} samples in {:?}",
                    buffer.len(),
                    started.elapsed()
                );
                on_complete(buffer);
            }
            Ok(Err(e)) => {
                error!("Error generating speech for {:?}: {}", request.text, e);
            }
            Err(_) => {
                warn!("Speech model panicked on {:?}", request.text);
            }
        }
    }
}

/// Resolve both voices, blend them and run the model
pub fn synthesize(
    model: &dyn SpeechModel,
    request: &SynthesisRequest,
    speed: f32,
    language: &str,
) -> Result<AudioBuffer> {
    let voice1 = model.embedding_for(&request.voice1)?;
    let voice2 = model.embedding_for(&request.voice2)?;
    let blended = voice1.blend_percent(&voice2, request.blend_percent)?;
    model.synthesize(&request.text, &blended, speed, language)
}
