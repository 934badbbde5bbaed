//! Second-order IIR section used as the chain's rumble filter.
//!
//! Direct form I:
//!
//! ```text
//! y[n] = b0·x[n] + b1·x[n-1] + b2·x[n-2] − a1·y[n-1] − a2·y[n-2]
//! ```
//!
//! Coefficients are fixed at construction.  The four history values are
//! updated after every sample, in order, and are only cleared by
//! [`Biquad::reset`] on stream re-initialization.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

use serde::{Deserialize, Serialize};

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    /// RBJ cookbook high-pass for an arbitrary cutoff and sample rate.
    pub fn highpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(1e-6));
        let cw0 = w0.cos();
        let inv_a0 = 1.0 / (1.0 + alpha);

        Self {
            b0: ((1.0 + cw0) * 0.5) * inv_a0,
            b1: -(1.0 + cw0) * inv_a0,
            b2: ((1.0 + cw0) * 0.5) * inv_a0,
            a1: (-2.0 * cw0) * inv_a0,
            a2: (1.0 - alpha) * inv_a0,
        }
    }
}

impl Default for BiquadCoeffs {
    /// Butterworth high-pass at 60 Hz for a 48 kHz stream.
    fn default() -> Self {
        Self::highpass(60.0, FRAC_1_SQRT_2, 48_000.0)
    }
}

/// Stateful biquad filter.  One instance per stream; never shared.
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Filter one sample.
    #[inline]
    pub fn apply(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Filter a block in place, sample by sample.
    pub fn apply_in_place(&mut self, samples: &mut [f32]) {
        for s in samples {
            *s = self.apply(*s);
        }
    }

    /// Clear the history.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new(BiquadCoeffs::default())
    }
}
