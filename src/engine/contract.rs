//! Denoising engine contract.
//!
//! # Overview
//!
//! [`DenoiseEngine`] is the interface the processing side drives, one frame
//! at a time.  It is object-safe and `Send` so it can be boxed and moved onto
//! the worker.  Calls happen on the processing side only, never inside the
//! audio callback, and any call may fail.
//!
//! [`DspEngine`](super::DspEngine) is the built-in implementation.
//!
//! [`MockEngine`] (available under `#[cfg(test)]`) echoes, scales, fails or
//! panics on demand, for exercising the worker and exchange without real
//! audio processing.

use thiserror::Error;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// All errors that can arise from a denoising engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The engine could not be constructed.
    #[error("Engine creation failed: {0}")]
    Create(String),

    /// The input frame does not have the length reported by
    /// [`DenoiseEngine::frame_length`].
    #[error("Frame length mismatch: engine expects {expected}, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// The engine failed while processing a frame.
    #[error("Frame processing failed: {0}")]
    Process(String),

    /// No engine is available for the requested configuration.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// FrameLengths
// ---------------------------------------------------------------------------

/// Frame lengths an engine can be reset to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLengths {
    /// Any positive length.
    Any,
    /// Only this length.
    Fixed(usize),
}

impl FrameLengths {
    pub fn allows(self, frame_length: usize) -> bool {
        match self {
            FrameLengths::Any => frame_length > 0,
            FrameLengths::Fixed(n) => frame_length == n,
        }
    }
}

// ---------------------------------------------------------------------------
// DenoiseEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, per-frame denoiser.
///
/// # Contract
///
/// - `process_frame` input must be exactly [`frame_length`](Self::frame_length)
///   samples; otherwise [`EngineError::FrameLength`] is returned.
/// - On success the output has the same length as the input.
/// - Frames are processed strictly in call order; engines may carry state
///   from one frame to the next until [`reset`](Self::reset).
pub trait DenoiseEngine: Send {
    /// Samples per frame this engine accepts.
    fn frame_length(&self) -> usize;

    /// Maximum attenuation, in dB.
    fn set_attenuation_limit(&mut self, db: f32);

    /// Post-filter strength (0 disables).
    fn set_post_filter_beta(&mut self, beta: f32);

    /// Denoise one frame.
    fn process_frame(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError>;

    /// Lengths [`reset`](Self::reset) accepts.
    fn frame_lengths(&self) -> FrameLengths {
        FrameLengths::Fixed(self.frame_length())
    }

    /// Drop all state carried between frames and switch to
    /// `frame_length`-sample frames.  Tuning survives the reset.
    ///
    /// The default keeps nothing between frames and only accepts the
    /// current length.
    fn reset(&mut self, frame_length: usize) -> Result<(), EngineError> {
        if frame_length != self.frame_length() {
            return Err(EngineError::FrameLength {
                expected: self.frame_length(),
                actual: frame_length,
            });
        }
        Ok(())
    }
}

// Compile-time assertion: Box<dyn DenoiseEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn DenoiseEngine>) {}
};

/// Shared length guard for implementations.
pub(crate) fn check_frame_length(expected: usize, input: &[f32]) -> Result<(), EngineError> {
    if input.len() != expected {
        return Err(EngineError::FrameLength {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MockEngine  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Return the input unchanged.
    Echo,
    /// Multiply every sample by the factor.
    Scale(f32),
    /// Fail every call.
    Fail,
    /// Panic inside `process_frame`.
    Panic,
    /// Fail every n-th call (1-based), echo otherwise.
    FailEvery(usize),
}

/// A test double with scripted behaviour.
#[cfg(test)]
pub struct MockEngine {
    frame_length: usize,
    behaviour: MockBehaviour,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    resets: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    pub attenuation_db: Option<f32>,
    pub post_filter_beta: Option<f32>,
}

#[cfg(test)]
impl MockEngine {
    pub fn new(frame_length: usize, behaviour: MockBehaviour) -> Self {
        Self {
            frame_length,
            behaviour,
            calls: Default::default(),
            resets: Default::default(),
            attenuation_db: None,
            post_filter_beta: None,
        }
    }

    pub fn echo(frame_length: usize) -> Self {
        Self::new(frame_length, MockBehaviour::Echo)
    }

    pub fn failing(frame_length: usize) -> Self {
        Self::new(frame_length, MockBehaviour::Fail)
    }

    /// Counter of `process_frame` calls, readable after the engine has been
    /// moved onto a worker.
    pub fn call_counter(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        std::sync::Arc::clone(&self.calls)
    }

    /// Counter of successful `reset` calls.
    pub fn reset_counter(&self) -> std::sync::Arc<std::sync::atomic::AtomicUsize> {
        std::sync::Arc::clone(&self.resets)
    }
}

#[cfg(test)]
impl DenoiseEngine for MockEngine {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn set_attenuation_limit(&mut self, db: f32) {
        self.attenuation_db = Some(db);
    }

    fn set_post_filter_beta(&mut self, beta: f32) {
        self.post_filter_beta = Some(beta);
    }

    fn process_frame(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
        use std::sync::atomic::Ordering;

        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        check_frame_length(self.frame_length, input)?;
        match self.behaviour {
            MockBehaviour::Echo => Ok(input.to_vec()),
            MockBehaviour::Scale(k) => Ok(input.iter().map(|s| s * k).collect()),
            MockBehaviour::Fail => Err(EngineError::Process("mock failure".into())),
            MockBehaviour::Panic => panic!("mock engine panic"),
            MockBehaviour::FailEvery(n) if call % n == 0 => {
                Err(EngineError::Process(format!("mock failure on call {call}")))
            }
            MockBehaviour::FailEvery(_) => Ok(input.to_vec()),
        }
    }

    fn frame_lengths(&self) -> FrameLengths {
        FrameLengths::Any
    }

    fn reset(&mut self, frame_length: usize) -> Result<(), EngineError> {
        if frame_length == 0 {
            return Err(EngineError::Create("frame length must be > 0".into()));
        }
        self.frame_length = frame_length;
        self.resets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
