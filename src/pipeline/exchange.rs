//! Cross-stage exchange: real-time side ⇄ processing side.
//!
//! Frames leave the audio callback through a bounded `tokio::sync::mpsc`
//! channel with `try_send`, so submission never waits.  Results come back on
//! a second channel and are drained with `try_recv` at the start of every
//! callback.  Ownership of each frame moves through the channels; nothing is
//! shared.
//!
//! # Pending queue
//!
//! ```text
//!  submit ─▶ [ InFlight(e3:7) | Rejected×2 | InFlight(e3:10) | … ] ─▶ resolve
//!                 ▲ oldest                                       (FIFO)
//! ```
//!
//! Every submission appends a slot.  A frame the processing side cannot take
//! (channel full or closed, or too many frames in flight) becomes a
//! `Rejected` slot; consecutive rejections share one slot.  Slots resolve
//! strictly front to back:
//!
//! * `Rejected×n` resolves immediately to `n` silent frames.
//! * `InFlight(h)` waits for the result carrying `h`.  An engine error, a
//!   panic, or an output of the wrong length resolves it to silence.
//!
//! # Epochs
//!
//! [`FrameHandle`] carries the epoch it was submitted in.  [`Exchange::reset`]
//! bumps the epoch and forgets every pending slot; results from an older
//! epoch are counted as stale and dropped.  The reset also travels down the
//! job channel as [`EngineJob::Reset`], so the engine starts over before the
//! first frame of the new epoch reaches it.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use crate::audio::{AudioFrame, PlaybackDrain, RingBuffer};
use crate::engine::{EngineError, FrameLengths};

use super::control::StreamError;
use super::state::SharedStats;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Identifies one submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle {
    pub epoch: u32,
    pub seq: u64,
}

/// A frame travelling to the processing side.
#[derive(Debug)]
pub struct FrameJob {
    pub handle: FrameHandle,
    pub frame: AudioFrame,
}

/// Work for the processing side, in submission order.
#[derive(Debug)]
pub enum EngineJob {
    /// Denoise one frame.
    Frame(FrameJob),
    /// Reset the engine for `frame_length`-sample frames.  Every later
    /// frame belongs to `epoch`.
    Reset { epoch: u32, frame_length: usize },
}

/// The processing side's answer for one [`FrameJob`].
#[derive(Debug)]
pub struct FrameResult {
    pub handle: FrameHandle,
    pub outcome: Result<AudioFrame, EngineError>,
}

/// Real-time end of the engine channels.
pub struct EngineLink {
    pub jobs: mpsc::Sender<EngineJob>,
    pub results: mpsc::Receiver<FrameResult>,
    /// Frame sizes a re-initialization may ask the engine for.
    pub frame_lengths: FrameLengths,
}

/// Processing end of the engine channels.
pub struct EnginePort {
    pub jobs: mpsc::Receiver<EngineJob>,
    pub results: mpsc::Sender<FrameResult>,
}

/// Create a linked pair of channels holding up to `depth` frame jobs.
///
/// The job channel keeps one extra slot for a reset.  The result channel is
/// twice as deep so a burst of completed frames never stalls the processing
/// side behind a slow callback.  The link accepts any frame length;
/// [`EngineWorker::channel`](super::EngineWorker::channel) narrows it to
/// what the engine supports.
pub fn engine_channel(depth: usize) -> (EngineLink, EnginePort) {
    let depth = depth.max(1);
    let (job_tx, job_rx) = mpsc::channel(depth + 1);
    let (result_tx, result_rx) = mpsc::channel(depth * 2);
    (
        EngineLink {
            jobs: job_tx,
            results: result_rx,
            frame_lengths: FrameLengths::Any,
        },
        EnginePort {
            jobs: job_rx,
            results: result_tx,
        },
    )
}

// ---------------------------------------------------------------------------
// Output helper
// ---------------------------------------------------------------------------

/// Queue `frame` for playback, counting a dropped oldest frame.
pub(crate) fn enqueue_output(drain: &mut PlaybackDrain, stats: &SharedStats, frame: AudioFrame) {
    if drain.enqueue(frame).is_some() {
        stats.add_output_overflows(1);
        log::debug!("exchange: output queue full, dropped oldest frame");
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingSlot {
    InFlight(FrameHandle),
    Rejected { count: usize },
}

pub struct Exchange {
    link: EngineLink,
    pending: RingBuffer<PendingSlot>,
    max_in_flight: usize,
    in_flight: usize,
    epoch: u32,
    next_seq: u64,
    frame_size: usize,
    stats: SharedStats,
}

impl Exchange {
    /// `max_in_flight` bounds frames handed to the processing side and not
    /// yet resolved.
    pub fn new(link: EngineLink, frame_size: usize, max_in_flight: usize, stats: SharedStats) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            link,
            // Rejected slots only ever sit between in-flight ones.
            pending: RingBuffer::new(max_in_flight * 2 + 1),
            max_in_flight,
            in_flight: 0,
            epoch: 0,
            next_seq: 0,
            frame_size,
            stats,
        }
    }

    /// Hand `frame` to the processing side without waiting.
    ///
    /// Always returns the frame's handle.  If the processing side cannot
    /// take it, the frame is dropped and a silent frame takes its place in
    /// the output order.
    pub fn submit(&mut self, frame: AudioFrame) -> FrameHandle {
        let handle = FrameHandle {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        if self.in_flight >= self.max_in_flight {
            self.reject("too many frames in flight");
            return handle;
        }

        match self.link.jobs.try_send(EngineJob::Frame(FrameJob { handle, frame })) {
            Ok(()) => {
                self.push_slot(PendingSlot::InFlight(handle));
                self.in_flight += 1;
                self.stats.add_submitted(1);
            }
            Err(TrySendError::Full(_)) => self.reject("engine queue full"),
            Err(TrySendError::Closed(_)) => self.reject("engine channel closed"),
        }
        handle
    }

    fn reject(&mut self, reason: &str) {
        self.stats.add_rejected(1);
        if let Some(PendingSlot::Rejected { count }) = self.pending.back_mut() {
            *count += 1;
            return;
        }
        log::warn!("exchange: frame rejected ({reason}), substituting silence");
        self.push_slot(PendingSlot::Rejected { count: 1 });
    }

    fn push_slot(&mut self, slot: PendingSlot) {
        // Capacity is 2·max_in_flight + 1 and rejected slots coalesce, so
        // this only fails if that bound is broken.
        if self.pending.push_back(slot).is_err() {
            log::error!("exchange: pending queue overflow, slot dropped");
        }
    }

    /// Drain every result that has arrived and move resolved frames into
    /// `drain`, in submission order.
    pub fn poll_results(&mut self, drain: &mut PlaybackDrain) {
        loop {
            match self.link.results.try_recv() {
                Ok(result) => self.accept(result, drain),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fail_in_flight(drain, "engine channel closed");
                    break;
                }
            }
        }
        self.flush_rejected(drain);
    }

    /// Resolve the oldest in-flight frame with output delivered by the host
    /// rather than through the result channel.
    pub fn deliver(&mut self, output: Vec<f32>, drain: &mut PlaybackDrain) {
        self.flush_rejected(drain);
        let Some(&PendingSlot::InFlight(handle)) = self.pending.front() else {
            self.stats.add_stale(1);
            log::debug!("exchange: engine result with nothing in flight, dropped");
            return;
        };
        self.accept(
            FrameResult {
                handle,
                outcome: Ok(AudioFrame::new(output)),
            },
            drain,
        );
    }

    fn accept(&mut self, result: FrameResult, drain: &mut PlaybackDrain) {
        if result.handle.epoch != self.epoch {
            self.stats.add_stale(1);
            return;
        }

        loop {
            self.flush_rejected(drain);
            let Some(&PendingSlot::InFlight(head)) = self.pending.front() else {
                self.stats.add_stale(1);
                log::debug!("exchange: result {:?} matches no pending frame", result.handle);
                return;
            };

            if head.seq == result.handle.seq {
                self.pending.pop_front();
                self.in_flight -= 1;
                self.resolve(result.outcome, drain);
                return;
            }
            if head.seq > result.handle.seq {
                self.stats.add_stale(1);
                log::debug!("exchange: duplicate result {:?}, dropped", result.handle);
                return;
            }

            // A later frame answered first: the head's result is lost.
            log::warn!("exchange: result for {head:?} never arrived");
            self.pending.pop_front();
            self.in_flight -= 1;
            self.resolve(Err(EngineError::Process("result lost".into())), drain);
        }
    }

    fn resolve(&mut self, outcome: Result<AudioFrame, EngineError>, drain: &mut PlaybackDrain) {
        let frame = match outcome {
            Ok(frame) if frame.len() == self.frame_size => {
                self.stats.add_completed(1);
                frame
            }
            Ok(frame) => {
                self.stats.add_engine_failures(1);
                log::warn!(
                    "exchange: engine returned {} samples, expected {}; substituting silence",
                    frame.len(),
                    self.frame_size
                );
                AudioFrame::silent(self.frame_size)
            }
            Err(e) => {
                self.stats.add_engine_failures(1);
                log::warn!("exchange: engine failed ({e}); substituting silence");
                AudioFrame::silent(self.frame_size)
            }
        };
        enqueue_output(drain, &self.stats, frame);
    }

    fn flush_rejected(&mut self, drain: &mut PlaybackDrain) {
        while let Some(&PendingSlot::Rejected { count }) = self.pending.front() {
            self.pending.pop_front();
            for _ in 0..count {
                enqueue_output(drain, &self.stats, AudioFrame::silent(self.frame_size));
            }
        }
    }

    fn fail_in_flight(&mut self, drain: &mut PlaybackDrain, reason: &str) {
        if self.in_flight == 0 {
            return;
        }
        log::warn!("exchange: {reason}; {} frames in flight become silence", self.in_flight);
        while let Some(slot) = self.pending.pop_front() {
            let count = match slot {
                PendingSlot::InFlight(_) => {
                    self.stats.add_engine_failures(1);
                    1
                }
                PendingSlot::Rejected { count } => count,
            };
            for _ in 0..count {
                enqueue_output(drain, &self.stats, AudioFrame::silent(self.frame_size));
            }
        }
        self.in_flight = 0;
    }

    /// Start a new epoch for frames of `frame_size` samples and queue an
    /// engine reset ahead of the new epoch's frames.
    ///
    /// Pending slots are forgotten without producing output; their results
    /// will be discarded as stale when they arrive.  On error nothing
    /// changes.
    ///
    /// # Errors
    ///
    /// * [`StreamError::EngineFrameSize`] when the engine is fixed at another
    ///   length.
    /// * [`StreamError::EngineBusy`] when the job channel has no room.
    pub fn reset(&mut self, frame_size: usize) -> Result<(), StreamError> {
        if let FrameLengths::Fixed(fixed) = self.link.frame_lengths {
            if fixed != frame_size {
                return Err(StreamError::EngineFrameSize {
                    requested: frame_size,
                    fixed,
                });
            }
        }

        let epoch = self.epoch.wrapping_add(1);
        let job = EngineJob::Reset {
            epoch,
            frame_length: frame_size,
        };
        match self.link.jobs.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(StreamError::EngineBusy),
            // No engine left to reset; later frames are rejected as silence.
            Err(TrySendError::Closed(_)) => {
                log::warn!("exchange: engine channel closed, resetting without the engine")
            }
        }

        if self.in_flight > 0 {
            self.stats.add_discarded(self.in_flight as u64);
            log::debug!("exchange: {} in-flight frames discarded by reset", self.in_flight);
        }
        self.epoch = epoch;
        self.next_seq = 0;
        self.pending.clear();
        self.in_flight = 0;
        self.frame_size = frame_size;
        Ok(())
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Frames handed over and not yet resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Submissions waiting to resolve, counting each rejected frame.
    pub fn pending_frames(&self) -> usize {
        self.pending
            .iter()
            .map(|slot| match slot {
                PendingSlot::InFlight(_) => 1,
                PendingSlot::Rejected { count } => *count,
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
