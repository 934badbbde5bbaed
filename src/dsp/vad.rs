//! Frame-level Voice Activity Detection (VAD).
//!
//! [`VoiceActivityDetector`] classifies each frame as speech or non-speech
//! from two cheap features:
//!
//! * **RMS energy**: silence and low-level room tone sit below the threshold.
//! * **Zero-crossing rate**: mains hum and rumble carry energy but cross
//!   zero rarely.
//!
//! Speech is declared only when *both* exceed their thresholds.  The detector
//! also keeps a silence run counter (consecutive non-speech frames), which
//! the chain uses to gate the fade-out and the noise-profile updates, and an
//! exponentially smoothed energy estimate for diagnostics.
//!
//! # Example
//!
//! ```rust
//! use live_denoise::dsp::{VadConfig, VoiceActivityDetector};
//!
//! let mut vad = VoiceActivityDetector::new(VadConfig::default());
//! assert!(!vad.classify(&vec![0.0_f32; 480]));
//! assert!(!vad.classify(&vec![0.0_f32; 480]));
//! assert_eq!(vad.silence_run(), 2);
//! ```

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// VadConfig
// ---------------------------------------------------------------------------

/// Thresholds for [`VoiceActivityDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadConfig {
    /// Minimum frame RMS for speech (linear, `[0.0, 1.0]`).
    pub energy_threshold: f32,
    /// Minimum zero crossings per sample for speech.
    pub zcr_threshold: f32,
    /// Weight of the previous value in the smoothed energy estimate.
    pub energy_smoothing: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.01,
            zcr_threshold: 0.1,
            energy_smoothing: 0.9,
        }
    }
}

// ---------------------------------------------------------------------------
// Feature helpers
// ---------------------------------------------------------------------------

/// Root-mean-square amplitude of `frame` (0 for an empty slice).
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let mean_sq: f32 = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
    mean_sq.sqrt()
}

/// Sign changes per sample.  Zero counts as positive.
pub fn zero_crossing_rate(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

// ---------------------------------------------------------------------------
// VoiceActivityDetector
// ---------------------------------------------------------------------------

/// Energy + zero-crossing speech classifier with a silence run counter.
#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    config: VadConfig,
    silence_run: usize,
    smoothed_energy: f32,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            silence_run: 0,
            smoothed_energy: 0.0,
        }
    }

    /// Classify `frame`; returns `true` for speech.
    ///
    /// Increments the silence run on non-speech, resets it to 0 on speech.
    /// An empty frame is non-speech.
    pub fn classify(&mut self, frame: &[f32]) -> bool {
        let energy = rms(frame);
        let zcr = zero_crossing_rate(frame);

        let s = self.config.energy_smoothing;
        self.smoothed_energy = s * self.smoothed_energy + (1.0 - s) * energy;

        let is_speech =
            energy > self.config.energy_threshold && zcr > self.config.zcr_threshold;

        if is_speech {
            self.silence_run = 0;
        } else {
            self.silence_run = self.silence_run.saturating_add(1);
        }
        is_speech
    }

    /// Consecutive non-speech frames seen so far.
    pub fn silence_run(&self) -> usize {
        self.silence_run
    }

    /// Exponentially smoothed frame RMS.
    pub fn smoothed_energy(&self) -> f32 {
        self.smoothed_energy
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.silence_run = 0;
        self.smoothed_energy = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / 48_000.0).sin())
            .collect()
    }

    // ---- Features ---

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5_f32; 100]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn zcr_of_alternating_signal() {
        let alt: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        // 99 crossings over 100 samples
        assert!((zero_crossing_rate(&alt) - 0.99).abs() < 1e-6);
        assert_eq!(zero_crossing_rate(&[0.3_f32; 50]), 0.0);
    }

    // ---- Classification ---

    #[test]
    fn silence_is_not_speech() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        assert!(!vad.classify(&[0.0_f32; 480]));
    }

    #[test]
    fn loud_high_frequency_is_speech() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        // 3 kHz → 6000 crossings/s → 0.125 per sample at 48 kHz.
        assert!(vad.classify(&sine(3_000.0, 0.3, 480)));
    }

    #[test]
    fn loud_hum_is_not_speech() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        // 50 Hz hum: plenty of energy, almost no crossings.
        assert!(!vad.classify(&sine(50.0, 0.5, 480)));
    }

    #[test]
    fn quiet_hiss_is_not_speech() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        assert!(!vad.classify(&sine(5_000.0, 0.005, 480)));
    }

    #[test]
    fn empty_frame_is_not_speech() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        assert!(!vad.classify(&[]));
    }

    // ---- Silence run ---

    #[test]
    fn silence_run_counts_and_resets() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        for expected in 1..=4 {
            vad.classify(&[0.0_f32; 480]);
            assert_eq!(vad.silence_run(), expected);
        }
        vad.classify(&sine(3_000.0, 0.3, 480));
        assert_eq!(vad.silence_run(), 0);
    }

    #[test]
    fn smoothed_energy_tracks_input() {
        let mut vad = VoiceActivityDetector::new(VadConfig::default());
        for _ in 0..200 {
            vad.classify(&[0.2_f32; 480]);
        }
        assert!((vad.smoothed_energy() - 0.2).abs() < 1e-3);

        vad.reset();
        assert_eq!(vad.smoothed_energy(), 0.0);
        assert_eq!(vad.silence_run(), 0);
    }
}
