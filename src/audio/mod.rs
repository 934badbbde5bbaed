//! Audio plumbing: framing, output queueing and host device I/O.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → downmix_to_mono → AudioChunk (mpsc)
//!           → FrameAssembler → AudioFrame … → PlaybackDrain
//!           → upmix_into → cpal output callback → Speaker
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use live_denoise::audio::{AudioFrame, FrameAssembler, PlaybackDrain};
//!
//! let mut assembler = FrameAssembler::new(480);
//! let mut drain = PlaybackDrain::new(8);
//!
//! assembler.push(&[0.0; 1000], |frame: AudioFrame| {
//!     drain.enqueue(frame);
//! });
//! assert_eq!(assembler.buffered(), 40);
//!
//! let mut out = vec![1.0; 1000];
//! let report = drain.fill(&mut out);
//! assert_eq!(report.written, 960);
//! assert_eq!(report.silence, 40);
//! ```

pub mod assembler;
pub mod buffer;
pub mod capture;
pub mod drain;
pub mod frame;
pub mod mix;
pub mod playback;

pub use assembler::FrameAssembler;
pub use buffer::RingBuffer;
pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use drain::{FillReport, PlaybackDrain};
pub use frame::AudioFrame;
pub use mix::{downmix_to_mono, upmix_into};
pub use playback::{AudioPlayback, PlaybackError};
