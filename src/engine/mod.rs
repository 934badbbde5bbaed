//! Denoising engines driven from the processing side.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               DenoiseEngine (trait)                  │
//! │   frame_length / set_attenuation_limit /             │
//! │   set_post_filter_beta / process_frame / reset       │
//! │                                                      │
//! │   ┌──────────────┐        ┌──────────────────────┐   │
//! │   │ EngineConfig │──────▶ │ DspEngine            │   │
//! │   │ DspConfig    │        │  DspChain            │   │
//! │   └──────────────┘        │  (subtraction on)    │   │
//! │                           └──────────────────────┘   │
//! │   learned engines: supplied by the host as           │
//! │   Box<dyn DenoiseEngine>                             │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use live_denoise::config::AppConfig;
//! use live_denoise::engine::{create_engine, DenoiseEngine};
//!
//! let config = AppConfig::default();
//! let mut engine = create_engine(&config.engine, &config.dsp, 480).unwrap();
//! let out = engine.process_frame(&vec![0.0; 480]).unwrap();
//! assert_eq!(out.len(), 480);
//! ```

pub mod contract;
pub mod dsp_engine;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use contract::{DenoiseEngine, EngineError, FrameLengths};
pub use dsp_engine::{attenuation_to_floor, DspEngine};

// test-only re-export so the pipeline tests can import the mock directly.
#[cfg(test)]
pub use contract::{MockBehaviour, MockEngine};

use crate::config::{DspConfig, EngineConfig};

/// Build the engine described by `engine` for `frame_length`-sample frames.
///
/// Only the built-in [`DspEngine`] can be created here.  A configured
/// `model_path` yields [`EngineError::Unavailable`]; hosts embedding a
/// learned model wrap it in [`DenoiseEngine`] themselves.
pub fn create_engine(
    engine: &EngineConfig,
    dsp: &DspConfig,
    frame_length: usize,
) -> Result<Box<dyn DenoiseEngine>, EngineError> {
    if let Some(path) = &engine.model_path {
        return Err(EngineError::Unavailable(format!(
            "no model backend for {}",
            path.display()
        )));
    }
    let mut built = DspEngine::create(dsp, frame_length, engine.attenuation_limit_db)?;
    built.set_post_filter_beta(engine.post_filter_beta);
    Ok(Box::new(built))
}
