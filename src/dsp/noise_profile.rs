//! Per-bin noise magnitude estimate with a one-shot calibration lifecycle.
//!
//! ```text
//!  NoProfile ──(silence run ≥ min)──▶ Estimating ──(max_updates reached)──▶ Active
//!                                         │  ▲
//!                                         └──┘ profile[k] = α·mag[k] + (1-α)·profile[k]
//! ```
//!
//! The first qualifying frame seeds the profile with its magnitudes; later
//! ones are blended in with exponential smoothing.  Once the update bound is
//! reached the profile is frozen: stationary noise is calibrated once and
//! never chased again.

use serde::{Deserialize, Serialize};

/// Tuning for [`NoiseProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfileConfig {
    /// Weight of the newest magnitudes in the exponential average.
    pub alpha: f32,
    /// Number of updates after which the profile freezes.
    pub max_updates: usize,
    /// Consecutive non-speech frames required before a frame may update.
    pub min_silence_frames: usize,
}

impl Default for NoiseProfileConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            max_updates: 100,
            min_silence_frames: 5,
        }
    }
}

/// Calibration state of a [`NoiseProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileState {
    /// No silent frame has been observed yet.
    NoProfile,
    /// Collecting silent frames.
    Estimating,
    /// Frozen; usable for subtraction.
    Active,
}

#[derive(Debug, Clone)]
pub struct NoiseProfile {
    config: NoiseProfileConfig,
    bins: Vec<f32>,
    updates: usize,
}

impl NoiseProfile {
    /// A blank profile of `bins` magnitudes (`fft_size / 2 + 1`).
    pub fn new(bins: usize, config: NoiseProfileConfig) -> Self {
        Self {
            config,
            bins: vec![0.0; bins],
            updates: 0,
        }
    }

    pub fn state(&self) -> ProfileState {
        if self.updates == 0 {
            ProfileState::NoProfile
        } else if self.updates < self.config.max_updates {
            ProfileState::Estimating
        } else {
            ProfileState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == ProfileState::Active
    }

    /// Offer one frame's magnitude spectrum.
    ///
    /// The frame is folded in only when `silence_run` has reached the
    /// configured minimum and the profile is not yet frozen.  Returns `true`
    /// when the profile changed.  A spectrum of the wrong length is ignored.
    pub fn observe(&mut self, magnitudes: &[f32], silence_run: usize) -> bool {
        if silence_run < self.config.min_silence_frames
            || self.is_active()
            || magnitudes.len() != self.bins.len()
        {
            return false;
        }

        if self.updates == 0 {
            self.bins.copy_from_slice(magnitudes);
        } else {
            let a = self.config.alpha;
            for (p, &m) in self.bins.iter_mut().zip(magnitudes) {
                *p = a * m + (1.0 - a) * *p;
            }
        }
        self.updates += 1;
        true
    }

    /// Current estimate, one magnitude per bin.
    pub fn magnitudes(&self) -> &[f32] {
        &self.bins
    }

    pub fn update_count(&self) -> usize {
        self.updates
    }

    pub fn reset(&mut self) {
        self.bins.fill(0.0);
        self.updates = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(max_updates: usize) -> NoiseProfile {
        NoiseProfile::new(
            4,
            NoiseProfileConfig {
                max_updates,
                ..NoiseProfileConfig::default()
            },
        )
    }

    // ---- State machine ---

    #[test]
    fn starts_without_profile() {
        let p = profile(3);
        assert_eq!(p.state(), ProfileState::NoProfile);
        assert_eq!(p.magnitudes(), &[0.0; 4]);
    }

    #[test]
    fn short_silence_does_not_update() {
        let mut p = profile(3);
        assert!(!p.observe(&[1.0; 4], 4));
        assert_eq!(p.state(), ProfileState::NoProfile);
    }

    #[test]
    fn progresses_to_active_and_freezes() {
        let mut p = profile(3);
        assert!(p.observe(&[1.0; 4], 5));
        assert_eq!(p.state(), ProfileState::Estimating);
        assert!(p.observe(&[1.0; 4], 6));
        assert!(p.observe(&[1.0; 4], 7));
        assert_eq!(p.state(), ProfileState::Active);

        assert!(!p.observe(&[9.0; 4], 8));
        assert_eq!(p.magnitudes(), &[1.0; 4]);
        assert_eq!(p.update_count(), 3);
    }

    // ---- Smoothing ---

    #[test]
    fn first_update_seeds_then_smooths() {
        let mut p = profile(100);
        p.observe(&[1.0, 2.0, 3.0, 4.0], 5);
        assert_eq!(p.magnitudes(), &[1.0, 2.0, 3.0, 4.0]);

        p.observe(&[0.0; 4], 5);
        let expected = [0.9, 1.8, 2.7, 3.6];
        for (got, want) in p.magnitudes().iter().zip(expected) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn stationary_noise_change_shrinks_to_zero() {
        let mut p = profile(100);
        let noise = [0.5_f32, 0.2, 0.7, 0.1];
        p.observe(&[0.0; 4], 5);

        let mut last_delta = f32::INFINITY;
        for _ in 0..150 {
            let before = p.magnitudes().to_vec();
            p.observe(&noise, 10);
            let delta = before
                .iter()
                .zip(p.magnitudes())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f32, f32::max);
            assert!(delta <= last_delta);
            last_delta = delta;
        }
        assert!(p.is_active());
        assert_eq!(last_delta, 0.0);
    }

    #[test]
    fn wrong_length_spectrum_is_ignored() {
        let mut p = profile(3);
        assert!(!p.observe(&[1.0; 3], 10));
        assert_eq!(p.update_count(), 0);
    }

    #[test]
    fn reset_returns_to_no_profile() {
        let mut p = profile(1);
        p.observe(&[1.0; 4], 5);
        assert!(p.is_active());
        p.reset();
        assert_eq!(p.state(), ProfileState::NoProfile);
        assert_eq!(p.magnitudes(), &[0.0; 4]);
    }
}
