//! Processing-side loop that drives a [`DenoiseEngine`].
//!
//! # Flow
//!
//! ```text
//! EngineJob (mpsc) ─▶ EngineWorker::run()  ← async tokio task
//!                        │
//!                        ├─ Reset  → spawn_blocking(engine.reset)
//!                        └─ Frame  → spawn_blocking(engine.process_frame)
//!                              ├─ Ok(Ok)   → FrameResult { Ok(frame) }
//!                              ├─ Ok(Err)  → FrameResult { Err(e) }
//!                              └─ Err(join) (panic) → FrameResult { Err(Process) }
//!                        │
//! FrameResult (mpsc) ◀───┘   one result per frame job, in job order
//! ```
//!
//! Jobs are processed one at a time, so results leave in exactly the order
//! jobs arrived.  A panicking engine poisons its mutex; the worker takes the
//! engine back out of the poisoned lock and keeps going.

use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::AudioFrame;
use crate::config::StreamConfig;
use crate::engine::{DenoiseEngine, EngineError, FrameLengths};

use super::exchange::{engine_channel, EngineJob, EngineLink, EnginePort, FrameResult};

/// Engine shared between the worker task and the blocking pool.
pub type SharedEngine = Arc<Mutex<Box<dyn DenoiseEngine>>>;

pub struct EngineWorker {
    engine: SharedEngine,
    frame_length: usize,
    frame_lengths: FrameLengths,
}

impl EngineWorker {
    pub fn new(engine: Box<dyn DenoiseEngine>) -> Self {
        Self {
            frame_length: engine.frame_length(),
            frame_lengths: engine.frame_lengths(),
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// [`engine_channel`] whose link only allows frame sizes this engine can
    /// be reset to.
    pub fn channel(&self, depth: usize) -> (EngineLink, EnginePort) {
        let (mut link, port) = engine_channel(depth);
        link.frame_lengths = self.frame_lengths;
        (link, port)
    }

    /// `config` with its frame size taken from the engine.
    pub fn stream_config(&self, config: &StreamConfig) -> StreamConfig {
        if config.frame_size != self.frame_length {
            log::info!(
                "worker: engine runs {}-sample frames, overriding configured {}",
                self.frame_length,
                config.frame_size
            );
        }
        StreamConfig {
            frame_size: self.frame_length,
            ..config.clone()
        }
    }

    /// Handle to the engine for out-of-band tuning while the worker runs.
    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until the job channel closes or the result receiver is dropped.
    ///
    /// Spawn as a tokio task.  Returns the number of frames processed.
    pub async fn run(self, port: EnginePort) -> u64 {
        let EnginePort {
            jobs: mut job_rx,
            results: result_tx,
        } = port;
        let mut processed = 0u64;

        while let Some(job) = job_rx.recv().await {
            let job = match job {
                EngineJob::Frame(job) => job,
                EngineJob::Reset {
                    epoch,
                    frame_length,
                } => {
                    self.reset(epoch, frame_length).await;
                    continue;
                }
            };
            let engine = Arc::clone(&self.engine);
            let frame = job.frame;

            let joined = tokio::task::spawn_blocking(move || {
                let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
                engine.process_frame(frame.as_slice())
            })
            .await;

            let outcome = match joined {
                Ok(Ok(output)) => Ok(AudioFrame::new(output)),
                Ok(Err(e)) => {
                    log::debug!("worker: frame {:?} failed: {e}", job.handle);
                    Err(e)
                }
                Err(e) => {
                    log::error!("worker: engine task panicked on {:?}: {e}", job.handle);
                    Err(EngineError::Process(format!("engine panicked: {e}")))
                }
            };
            processed += 1;

            let result = FrameResult {
                handle: job.handle,
                outcome,
            };
            if result_tx.send(result).await.is_err() {
                log::info!("worker: result channel closed, stopping");
                return processed;
            }
        }

        log::info!("worker: job channel closed, stopping after {processed} frames");
        processed
    }

    /// A failed reset leaves the engine as it was; frames of the new size
    /// then fail and play as silence.
    async fn reset(&self, epoch: u32, frame_length: usize) {
        let engine = Arc::clone(&self.engine);
        let joined = tokio::task::spawn_blocking(move || {
            let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
            engine.reset(frame_length)
        })
        .await;

        match joined {
            Ok(Ok(())) => log::info!("worker: engine reset for epoch {epoch} (frame {frame_length})"),
            Ok(Err(e)) => log::error!("worker: engine reset for epoch {epoch} failed: {e}"),
            Err(e) => log::error!("worker: engine panicked during reset for epoch {epoch}: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
