//! Standalone DSP preprocessing.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── DspChain ─────────────────────────────┐
//! │                                                                    │
//! │  Biquad ──▶ VoiceActivityDetector ──▶ SpectralEngine ──▶ Agc       │
//! │  (60 Hz HPF)  (energy ∧ ZCR,           ├─ Fft (radix-2)            │
//! │               silence run)             ├─ hann window, overlap-add │
//! │                                        └─ NoiseProfile             │
//! │                                           NoProfile → Estimating   │
//! │                                                     → Active       │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage owns its state; nothing here is shared between streams or
//! threads.  The chain runs either inline on the real-time side (before the
//! engine, or on its own) or inside [`DspEngine`](crate::engine::DspEngine)
//! on the processing side.
//!
//! # Quick start
//!
//! ```rust
//! use live_denoise::audio::AudioFrame;
//! use live_denoise::config::DspConfig;
//! use live_denoise::dsp::DspChain;
//!
//! let mut chain = DspChain::new(&DspConfig::default(), 480).unwrap();
//! let out = chain.preprocess(AudioFrame::silent(480)).unwrap();
//! assert!(out.is_silent());
//! ```

pub mod agc;
pub mod biquad;
pub mod chain;
pub mod fft;
pub mod noise_profile;
pub mod spectral;
pub mod vad;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use agc::{Agc, AgcConfig};
pub use biquad::{Biquad, BiquadCoeffs};
pub use chain::{DspChain, FrameReport};
pub use fft::{Fft, FftError};
pub use noise_profile::{NoiseProfile, NoiseProfileConfig, ProfileState};
pub use spectral::{hann_window, SpectralEngine};
pub use vad::{rms, zero_crossing_rate, VadConfig, VoiceActivityDetector};
