//! Frame assembly: turns host-sized callback blocks into fixed-size frames.
//!
//! The host audio runtime delivers input in whatever block size it likes
//! (128, 256, 441 … samples), which need not divide the frame size.  The
//! [`FrameAssembler`] copies each block into a pre-allocated accumulator and
//! emits an [`AudioFrame`] every time the accumulator fills.
//!
//! ```text
//!  block 1 (128)   block 2 (128)   block 3 (128)   block 4 (128)
//! ├──────────────┼──────────────┼──────────────┼──────┤──────┤
//! │◀──────────────── frame 1 (480) ──────────────────▶│ 32 … │
//! ```
//!
//! Samples are never dropped or reordered, with one documented exception:
//! [`FrameAssembler::reset`] (stream re-initialization) discards the partial
//! frame.

use super::AudioFrame;

// ---------------------------------------------------------------------------
// FrameAssembler
// ---------------------------------------------------------------------------

/// Accumulates arbitrary-length input chunks into `frame_size` frames.
///
/// # Example
///
/// ```rust
/// use live_denoise::audio::FrameAssembler;
///
/// let mut assembler = FrameAssembler::new(480);
/// let mut frames = Vec::new();
/// assembler.push(&vec![0.0_f32; 1600], |frame| frames.push(frame));
///
/// assert_eq!(frames.len(), 3);
/// assert_eq!(assembler.buffered(), 160);
/// ```
pub struct FrameAssembler {
    accumulator: Vec<f32>,
    /// Write position inside `accumulator`; always `< frame_size` between calls.
    cursor: usize,
}

impl FrameAssembler {
    /// Create an assembler producing frames of `frame_size` samples.
    ///
    /// # Panics
    ///
    /// Panics if `frame_size == 0`.
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame_size must be > 0");
        Self {
            accumulator: vec![0.0; frame_size],
            cursor: 0,
        }
    }

    /// Copy `samples` into the accumulator, calling `on_frame` for every
    /// frame boundary crossed.
    ///
    /// A single call may emit zero, one or several frames.  Returns the
    /// number of frames emitted.
    pub fn push<F>(&mut self, samples: &[f32], mut on_frame: F) -> usize
    where
        F: FnMut(AudioFrame),
    {
        let frame_size = self.accumulator.len();
        let mut read = 0;
        let mut emitted = 0;

        while read < samples.len() {
            let needed = frame_size - self.cursor;
            let to_copy = needed.min(samples.len() - read);

            self.accumulator[self.cursor..self.cursor + to_copy]
                .copy_from_slice(&samples[read..read + to_copy]);
            self.cursor += to_copy;
            read += to_copy;

            if self.cursor == frame_size {
                on_frame(AudioFrame::from_slice(&self.accumulator));
                self.cursor = 0;
                emitted += 1;
            }
        }

        emitted
    }

    /// Discard any partially accumulated frame.
    ///
    /// This is a deliberate data-loss point used on stream re-initialization;
    /// up to `frame_size - 1` samples are dropped.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Number of samples waiting for the next frame boundary.
    pub fn buffered(&self) -> usize {
        self.cursor
    }

    pub fn frame_size(&self) -> usize {
        self.accumulator.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    fn collect(assembler: &mut FrameAssembler, samples: &[f32]) -> Vec<AudioFrame> {
        let mut frames = Vec::new();
        assembler.push(samples, |f| frames.push(f));
        frames
    }

    // ---- Frame boundaries --------------------------------------------------

    #[test]
    fn small_chunks_accumulate_until_full() {
        let mut asm = FrameAssembler::new(480);
        for i in 0..3 {
            assert!(collect(&mut asm, &ramp(i * 128, 128)).is_empty());
        }
        assert_eq!(asm.buffered(), 384);

        let frames = collect(&mut asm, &ramp(384, 128));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_slice(), ramp(0, 480).as_slice());
        assert_eq!(asm.buffered(), 32);
    }

    #[test]
    fn large_chunk_emits_multiple_frames() {
        let mut asm = FrameAssembler::new(480);
        let frames = collect(&mut asm, &vec![0.0; 1600]);
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.len() == 480));
        assert_eq!(asm.buffered(), 160);
    }

    #[test]
    fn exact_frame_chunk_leaves_nothing_buffered() {
        let mut asm = FrameAssembler::new(256);
        assert_eq!(asm.push(&ramp(0, 256), |_| {}), 1);
        assert_eq!(asm.buffered(), 0);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut asm = FrameAssembler::new(480);
        assert_eq!(asm.push(&[], |_| {}), 0);
        assert_eq!(asm.buffered(), 0);
    }

    // ---- Ordering / no loss ------------------------------------------------

    #[test]
    fn uneven_chunks_preserve_every_sample_in_order() {
        let frame_size = 480;
        let total = frame_size * 7;
        let input = ramp(0, total);

        let mut asm = FrameAssembler::new(frame_size);
        let mut frames = Vec::new();
        let chunk_sizes = [1usize, 127, 441, 480, 999, 33, 2];
        let mut pos = 0;
        let mut i = 0;
        while pos < total {
            let n = chunk_sizes[i % chunk_sizes.len()].min(total - pos);
            asm.push(&input[pos..pos + n], |f| frames.push(f));
            pos += n;
            i += 1;
        }

        assert_eq!(frames.len(), total / frame_size);
        let joined: Vec<f32> = frames.iter().flat_map(|f| f.as_slice().to_vec()).collect();
        assert_eq!(joined, input);
    }

    // ---- Reset -------------------------------------------------------------

    #[test]
    fn reset_discards_partial_frame() {
        let mut asm = FrameAssembler::new(4);
        asm.push(&[1.0, 2.0, 3.0], |_| {});
        asm.reset();
        assert_eq!(asm.buffered(), 0);

        let frames = collect(&mut asm, &[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(frames[0].as_slice(), &[5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    #[should_panic(expected = "frame_size must be > 0")]
    fn zero_frame_size_panics() {
        FrameAssembler::new(0);
    }
}
