//! Real-time microphone denoising.
//!
//! Host audio callbacks deliver blocks of any size; [`pipeline::DenoiseStream`]
//! assembles them into fixed frames, optionally runs the [`dsp`] chain,
//! hands frames to a [`engine::DenoiseEngine`] on the processing side and
//! plays the results back in order, filling gaps with silence.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod pipeline;
