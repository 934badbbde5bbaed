//! FFT-based spectral subtraction with overlap-add reconstruction.
//!
//! # Per-frame flow
//!
//! ```text
//!  frame ─▶ zero-pad to N ─▶ × hann ─▶ FFT ─▶ |X[k]|, ∠X[k]   (k = 0..=N/2)
//!                                               │
//!                          NoiseProfile ◀───────┤ (silent frames only)
//!                                               ▼
//!                   |X'[k]| = max(|X[k]| − α·P[k], β·|X[k]|)   (once Active)
//!                                               │
//!     output ◀─ overlap-add ◀─ × hann ◀─ IFFT ◀─ mirror bins N/2+1..N−1
//! ```
//!
//! Analysis ([`SpectralEngine::analyze`]), noise tracking
//! ([`SpectralEngine::track_noise`]) and reconstruction
//! ([`SpectralEngine::synthesize`]) are separate steps so the chain can keep
//! the profile calibrating while subtraction itself is switched off, without
//! paying for a second transform.
//!
//! The reconstructed block is `N` samples long.  Its first half is final
//! (summed with the stored tail of the previous block); its second half is
//! stored as the new overlap tail and also emitted provisionally.

use std::f32::consts::PI;

use num_complex::Complex32;

use super::fft::{Fft, FftError};
use super::noise_profile::{NoiseProfile, NoiseProfileConfig, ProfileState};

/// Symmetric Hann window: `0.5 − 0.5·cos(2πi / (N−1))`.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
        .collect()
}

// ---------------------------------------------------------------------------
// SpectralEngine
// ---------------------------------------------------------------------------

pub struct SpectralEngine {
    fft: Fft,
    window: Vec<f32>,
    spectrum: Vec<Complex32>,
    magnitudes: Vec<f32>,
    phases: Vec<f32>,
    overlap: Vec<f32>,
    output: Vec<f32>,
    profile: NoiseProfile,
    over_subtraction: f32,
    spectral_floor: f32,
}

impl SpectralEngine {
    /// Build an engine for `fft_size`-point transforms.
    ///
    /// # Errors
    ///
    /// [`FftError::NotPowerOfTwo`] when `fft_size` cannot be planned.
    pub fn new(
        fft_size: usize,
        over_subtraction: f32,
        spectral_floor: f32,
        profile: NoiseProfileConfig,
    ) -> Result<Self, FftError> {
        let fft = Fft::new(fft_size)?;
        let bins = fft_size / 2 + 1;
        Ok(Self {
            fft,
            window: hann_window(fft_size),
            spectrum: vec![Complex32::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; bins],
            phases: vec![0.0; bins],
            overlap: vec![0.0; fft_size / 2],
            output: vec![0.0; fft_size],
            profile: NoiseProfile::new(bins, profile),
            over_subtraction,
            spectral_floor,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// Window, transform and split `frame` into magnitude and phase.
    ///
    /// Frames shorter than the FFT size are zero-padded.
    ///
    /// # Errors
    ///
    /// [`FftError::LengthMismatch`] when `frame` is longer than the FFT size.
    pub fn analyze(&mut self, frame: &[f32]) -> Result<(), FftError> {
        let n = self.fft.size();
        if frame.len() > n {
            return Err(FftError::LengthMismatch {
                expected: n,
                actual: frame.len(),
            });
        }

        for (i, c) in self.spectrum.iter_mut().enumerate() {
            let x = frame.get(i).copied().unwrap_or(0.0);
            *c = Complex32::new(x * self.window[i], 0.0);
        }
        self.fft.forward(&mut self.spectrum)?;

        for k in 0..=n / 2 {
            let (mag, phase) = self.spectrum[k].to_polar();
            self.magnitudes[k] = mag;
            self.phases[k] = phase;
        }
        Ok(())
    }

    /// Offer the last analysed spectrum to the noise profile.
    pub fn track_noise(&mut self, silence_run: usize) -> bool {
        self.profile.observe(&self.magnitudes, silence_run)
    }

    /// Rebuild the last analysed frame and overlap-add it.
    ///
    /// `input_gain` scales the analysed magnitudes first, which is the same
    /// as scaling the frame before [`analyze`](Self::analyze).  Magnitudes are
    /// then reduced by the noise profile once it is
    /// [`Active`](ProfileState::Active); before that the frame passes through.
    /// Returns `fft_size` samples.
    pub fn synthesize(&mut self, input_gain: f32) -> Result<&[f32], FftError> {
        let n = self.fft.size();
        let half = n / 2;

        if input_gain != 1.0 {
            for mag in &mut self.magnitudes {
                *mag *= input_gain;
            }
        }

        if self.profile.is_active() {
            let noise = self.profile.magnitudes();
            for (mag, &p) in self.magnitudes.iter_mut().zip(noise) {
                *mag = (*mag - self.over_subtraction * p).max(self.spectral_floor * *mag);
            }
        }

        for k in 0..=half {
            self.spectrum[k] = Complex32::from_polar(self.magnitudes[k], self.phases[k]);
        }
        for k in 1..half {
            self.spectrum[n - k] = self.spectrum[k].conj();
        }
        self.fft.inverse(&mut self.spectrum)?;

        for i in 0..n {
            self.output[i] = self.spectrum[i].re * self.window[i];
        }
        for i in 0..half {
            self.output[i] += self.overlap[i];
            self.overlap[i] = self.output[half + i];
        }
        Ok(self.output.as_slice())
    }

    /// [`analyze`](Self::analyze) followed by [`synthesize`](Self::synthesize).
    pub fn process(&mut self, frame: &[f32]) -> Result<&[f32], FftError> {
        self.analyze(frame)?;
        self.synthesize(1.0)
    }

    pub fn profile_state(&self) -> ProfileState {
        self.profile.state()
    }

    pub fn noise_profile(&self) -> &NoiseProfile {
        &self.profile
    }

    pub fn set_over_subtraction(&mut self, factor: f32) {
        self.over_subtraction = factor;
    }

    pub fn set_spectral_floor(&mut self, floor: f32) {
        self.spectral_floor = floor;
    }

    /// Clear the overlap tail and the noise profile.
    pub fn reset(&mut self) {
        self.overlap.fill(0.0);
        self.output.fill(0.0);
        self.profile.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(max_updates: usize) -> SpectralEngine {
        SpectralEngine::new(
            64,
            2.0,
            0.1,
            NoiseProfileConfig {
                max_updates,
                min_silence_frames: 0,
                ..NoiseProfileConfig::default()
            },
        )
        .unwrap()
    }

    /// Deterministic pseudo-random noise in [-amp, amp].
    fn noise(len: usize, amp: f32) -> Vec<f32> {
        let mut state = 0x1234_5678_u32;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0) * amp
            })
            .collect()
    }

    // ---- Window ------------------------------------------------------------

    #[test]
    fn hann_is_symmetric_with_zero_ends() {
        let w = hann_window(512);
        assert!(w[0].abs() < 1e-7);
        assert!(w[511].abs() < 1e-6);
        for i in 0..256 {
            assert!((w[i] - w[511 - i]).abs() < 1e-5);
        }
    }

    // ---- Pass-through reconstruction ---------------------------------------

    #[test]
    fn without_profile_output_is_double_windowed_input() {
        let mut eng = engine(100);
        let x = noise(64, 0.5);
        let w = hann_window(64);

        let out = eng.process(&x).unwrap().to_vec();
        assert_eq!(out.len(), 64);
        for i in 0..64 {
            assert!((out[i] - x[i] * w[i] * w[i]).abs() < 1e-4, "sample {i}");
        }
    }

    #[test]
    fn second_block_adds_previous_tail() {
        let mut eng = engine(100);
        let w = hann_window(64);
        let a = noise(64, 0.5);
        let b = vec![0.25_f32; 64];

        eng.process(&a).unwrap();
        let out = eng.process(&b).unwrap().to_vec();
        for i in 0..32 {
            let expected = b[i] * w[i] * w[i] + a[32 + i] * w[32 + i] * w[32 + i];
            assert!((out[i] - expected).abs() < 1e-4, "sample {i}");
        }
    }

    #[test]
    fn short_frame_is_zero_padded() {
        let mut eng = engine(100);
        let out = eng.process(&[0.0_f32; 48]).unwrap();
        assert_eq!(out.len(), 64);
        assert!(out.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn long_frame_is_rejected() {
        let mut eng = engine(100);
        assert_eq!(
            eng.analyze(&[0.0_f32; 65]),
            Err(FftError::LengthMismatch { expected: 64, actual: 65 })
        );
    }

    // ---- Noise tracking and subtraction ------------------------------------

    #[test]
    fn profile_activates_after_bounded_updates() {
        let mut eng = engine(3);
        let x = noise(64, 0.1);
        for _ in 0..3 {
            assert_ne!(eng.profile_state(), ProfileState::Active);
            eng.analyze(&x).unwrap();
            assert!(eng.track_noise(10));
        }
        assert_eq!(eng.profile_state(), ProfileState::Active);
        eng.analyze(&x).unwrap();
        assert!(!eng.track_noise(10));
    }

    #[test]
    fn calibrated_noise_drops_to_spectral_floor() {
        let x = noise(64, 0.3);

        let mut reference = engine(100);
        let untouched = reference.process(&x).unwrap().to_vec();

        let mut eng = engine(2);
        for _ in 0..2 {
            eng.analyze(&x).unwrap();
            eng.track_noise(10);
        }
        let reduced = eng.process(&x).unwrap().to_vec();

        // |X| − 2|X| < 0.1|X|, so every bin lands on the floor.
        for (r, u) in reduced.iter().zip(&untouched) {
            assert!((r - 0.1 * u).abs() < 1e-4);
        }
    }

    #[test]
    fn input_gain_scales_reconstruction() {
        let x = noise(64, 0.4);
        let mut plain = engine(100);
        let full = plain.process(&x).unwrap().to_vec();

        let mut eng = engine(100);
        eng.analyze(&x).unwrap();
        let half = eng.synthesize(0.5).unwrap();
        for (h, f) in half.iter().zip(&full) {
            assert!((h - 0.5 * f).abs() < 1e-4);
        }
    }

    #[test]
    fn reset_clears_profile_and_tail() {
        let mut eng = engine(1);
        let x = noise(64, 0.3);
        eng.analyze(&x).unwrap();
        eng.track_noise(10);
        eng.synthesize(1.0).unwrap();
        eng.reset();

        assert_eq!(eng.profile_state(), ProfileState::NoProfile);
        let out = eng.process(&[0.0_f32; 64]).unwrap();
        assert!(out.iter().all(|s| s.abs() < 1e-6));
    }
}
