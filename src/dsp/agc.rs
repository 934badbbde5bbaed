//! Automatic Gain Control.
//!
//! Every frame is pulled toward a target RMS:
//!
//! ```text
//! target = clamp(target_rms / max(rms, ε), min_gain, max_gain)
//! gain   = s·gain + (1 − s)·target
//! y[n]   = clamp(gain · x[n], −1, 1)
//! ```
//!
//! The moving average keeps gain changes inaudible; the final clamp keeps
//! the output inside the normalised sample range no matter what the gain is.

use serde::{Deserialize, Serialize};

use super::vad::rms;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgcConfig {
    /// Desired frame RMS (0.05 ≈ −26 dBFS).
    pub target_rms: f32,
    pub min_gain: f32,
    pub max_gain: f32,
    /// Weight of the previous gain in the moving average.
    pub smoothing: f32,
    /// Lower bound on the measured RMS, guarding the division.
    pub epsilon: f32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            target_rms: 0.05,
            min_gain: 0.1,
            max_gain: 10.0,
            smoothing: 0.99,
            epsilon: 1e-6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Agc {
    config: AgcConfig,
    gain: f32,
}

impl Agc {
    pub fn new(config: AgcConfig) -> Self {
        Self { config, gain: 1.0 }
    }

    /// Scale `frame` in place and return the gain that was applied.
    pub fn apply(&mut self, frame: &mut [f32]) -> f32 {
        let c = &self.config;
        let level = rms(frame).max(c.epsilon);
        let target = (c.target_rms / level).clamp(c.min_gain, c.max_gain);

        let smoothed = c.smoothing * self.gain + (1.0 - c.smoothing) * target;
        // Both terms already lie in range; the clamp absorbs rounding.
        self.gain = smoothed.clamp(c.min_gain, c.max_gain);

        for s in frame.iter_mut() {
            *s = (*s * self.gain).clamp(-1.0, 1.0);
        }
        self.gain
    }

    /// Gain applied to the most recent frame (1.0 before the first).
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn reset(&mut self) {
        self.gain = 1.0;
    }
}
