//! Playback drain: serves host-sized output blocks from completed frames.
//!
//! Completed frames wait in a bounded [`RingBuffer`] (the output frame
//! queue).  Each [`PlaybackDrain::fill`] call copies from the head frame into
//! the host buffer, keeps a read cursor into a partially consumed frame, and
//! zero-fills whatever it cannot cover.  Zero-filling is the intended
//! behaviour during pipeline warm-up and on underrun; it is never an error.

use super::{AudioFrame, RingBuffer};

// ---------------------------------------------------------------------------
// PlaybackDrain
// ---------------------------------------------------------------------------

/// Output frame queue plus the read cursor into its head frame.
pub struct PlaybackDrain {
    queue: RingBuffer<AudioFrame>,
    /// Frame currently being played, taken from the head of `queue`.
    current: Option<AudioFrame>,
    /// Read position inside `current` (0 ≤ cursor ≤ current.len()).
    cursor: usize,
}

/// What a single [`PlaybackDrain::fill`] call managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    /// Samples copied from queued frames.
    pub written: usize,
    /// Samples zero-filled because the queue ran dry.
    pub silence: usize,
}

impl FillReport {
    /// Returns `true` when any part of the block had to be zero-filled.
    pub fn is_underrun(&self) -> bool {
        self.silence > 0
    }
}

impl PlaybackDrain {
    /// Create a drain whose queue holds at most `depth` frames.
    pub fn new(depth: usize) -> Self {
        Self {
            queue: RingBuffer::new(depth),
            current: None,
            cursor: 0,
        }
    }

    /// Queue a completed frame for playback.
    ///
    /// When the queue is already at its depth the oldest queued frame is
    /// dropped to cap output latency, and returned to the caller.
    pub fn enqueue(&mut self, frame: AudioFrame) -> Option<AudioFrame> {
        self.queue.push_overwrite(frame)
    }

    /// Fill `out` completely: queued samples first, then silence.
    pub fn fill(&mut self, out: &mut [f32]) -> FillReport {
        let mut written = 0;

        while written < out.len() {
            let exhausted = match &self.current {
                Some(frame) => self.cursor >= frame.len(),
                None => true,
            };
            if exhausted {
                self.current = self.queue.pop_front();
                self.cursor = 0;
            }
            let Some(frame) = &self.current else {
                break;
            };

            let available = frame.len() - self.cursor;
            let to_copy = available.min(out.len() - written);
            out[written..written + to_copy]
                .copy_from_slice(&frame.as_slice()[self.cursor..self.cursor + to_copy]);
            self.cursor += to_copy;
            written += to_copy;
        }

        out[written..].fill(0.0);

        FillReport {
            written,
            silence: out.len() - written,
        }
    }

    /// Drop every queued frame and the partially played one.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
        self.cursor = 0;
    }

    /// Whole frames waiting in the queue (excluding the one being played).
    pub fn queued_frames(&self) -> usize {
        self.queue.len()
    }

    /// Total samples still available for playback.
    pub fn available_samples(&self) -> usize {
        let current = self
            .current
            .as_ref()
            .map_or(0, |f| f.len().saturating_sub(self.cursor));
        let queued: usize = self.queue.iter().map(AudioFrame::len).sum();
        current + queued
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
