//! DSP preprocessing chain: `preprocess(frame) -> frame`.
//!
//! ```text
//!  frame ─▶ high-pass ─▶ VAD ─┬─▶ analyze ─▶ noise profile (always tracked)
//!                             │
//!                             ├─▶ fade-out gate (silence run > N)
//!                             │
//!                             ├─▶ spectral subtraction (flag on && profile Active)
//!                             │
//!                             └─▶ AGC ─▶ frame
//! ```
//!
//! The fade is a time-domain gate and subtraction a frequency-domain
//! attenuation.  When both apply, the fade factor scales the analysed
//! spectrum before subtraction, which is identical to fading the frame first
//! but keeps the noise profile calibrated against the un-faded signal.

use crate::audio::AudioFrame;
use crate::config::DspConfig;

use super::agc::Agc;
use super::biquad::Biquad;
use super::fft::FftError;
use super::noise_profile::ProfileState;
use super::spectral::SpectralEngine;
use super::vad::VoiceActivityDetector;

/// What the chain decided for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub is_speech: bool,
    pub silence_run: usize,
    /// Fade factor applied (1.0 = untouched).
    pub fade: f32,
    /// Whether spectral subtraction rewrote the frame.
    pub subtracted: bool,
    /// AGC gain applied.
    pub gain: f32,
}

pub struct DspChain {
    highpass: Biquad,
    vad: VoiceActivityDetector,
    spectral: SpectralEngine,
    agc: Agc,
    spectral_subtraction: bool,
    fade_after_frames: usize,
    fade_step: f32,
}

impl DspChain {
    /// Build a chain for frames of `frame_size` samples.
    ///
    /// The transform size is `config.fft_size`, widened to the next power of
    /// two when a frame would not fit.
    pub fn new(config: &DspConfig, frame_size: usize) -> Result<Self, FftError> {
        let fft_size = config.fft_size.max(frame_size.next_power_of_two());
        let spectral = SpectralEngine::new(
            fft_size,
            config.over_subtraction,
            config.spectral_floor,
            config.noise,
        )?;
        if fft_size != config.fft_size {
            log::debug!(
                "dsp: frame size {frame_size} exceeds fft size {}, using {fft_size}",
                config.fft_size
            );
        }

        Ok(Self {
            highpass: Biquad::new(config.highpass),
            vad: VoiceActivityDetector::new(config.vad),
            spectral,
            agc: Agc::new(config.agc),
            spectral_subtraction: config.spectral_subtraction,
            fade_after_frames: config.fade_after_frames,
            fade_step: config.fade_step,
        })
    }

    /// Run the chain over an owned frame and hand it back.
    pub fn preprocess(&mut self, frame: AudioFrame) -> Result<AudioFrame, FftError> {
        let mut samples = frame.into_vec();
        self.process_in_place(&mut samples)?;
        Ok(AudioFrame::new(samples))
    }

    /// Run the chain over `samples` in place.
    ///
    /// # Errors
    ///
    /// [`FftError::LengthMismatch`] when `samples` is longer than the
    /// transform size the chain was built for.  `samples` has already been
    /// high-passed at that point and the caller should discard it.
    pub fn process_in_place(&mut self, samples: &mut [f32]) -> Result<FrameReport, FftError> {
        self.highpass.apply_in_place(samples);

        let is_speech = self.vad.classify(samples);
        let silence_run = self.vad.silence_run();

        let was_active = self.spectral.profile_state() == ProfileState::Active;
        self.spectral.analyze(samples)?;
        self.spectral.track_noise(silence_run);
        if !was_active && self.spectral.profile_state() == ProfileState::Active {
            log::info!("dsp: noise profile calibrated, profile frozen");
        }

        let fade = self.fade_factor(is_speech, silence_run);
        let subtracted = self.spectral_subtraction
            && self.spectral.profile_state() == ProfileState::Active;

        if subtracted {
            let rebuilt = self.spectral.synthesize(fade)?;
            samples.copy_from_slice(&rebuilt[..samples.len()]);
        } else if fade < 1.0 {
            for s in samples.iter_mut() {
                *s *= fade;
            }
        }

        let gain = self.agc.apply(samples);

        Ok(FrameReport {
            is_speech,
            silence_run,
            fade,
            subtracted,
            gain,
        })
    }

    /// Linear ramp toward zero once silence outlasts `fade_after_frames`.
    fn fade_factor(&self, is_speech: bool, silence_run: usize) -> f32 {
        if is_speech || silence_run <= self.fade_after_frames {
            return 1.0;
        }
        let over = (silence_run - self.fade_after_frames) as f32;
        (1.0 - over * self.fade_step).max(0.0)
    }

    pub fn set_spectral_subtraction(&mut self, enabled: bool) {
        self.spectral_subtraction = enabled;
    }

    pub fn set_over_subtraction(&mut self, factor: f32) {
        self.spectral.set_over_subtraction(factor);
    }

    pub fn set_spectral_floor(&mut self, floor: f32) {
        self.spectral.set_spectral_floor(floor);
    }

    pub fn profile_state(&self) -> ProfileState {
        self.spectral.profile_state()
    }

    pub fn fft_size(&self) -> usize {
        self.spectral.fft_size()
    }

    pub fn gain(&self) -> f32 {
        self.agc.gain()
    }

    /// Clear filter history, VAD counters, overlap tail, noise profile and gain.
    pub fn reset(&mut self) {
        self.highpass.reset();
        self.vad.reset();
        self.spectral.reset();
        self.agc.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn chain() -> DspChain {
        DspChain::new(&DspConfig::default(), 480).unwrap()
    }

    fn tone(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / 48_000.0).sin())
            .collect()
    }

    // ---- Silence -----------------------------------------------------------

    #[test]
    fn zero_frames_stay_zero() {
        let mut c = chain();
        for _ in 0..3 {
            let out = c.preprocess(AudioFrame::silent(480)).unwrap();
            assert_eq!(out.len(), 480);
            assert!(out.is_silent());
        }
    }

    #[test]
    fn zero_frames_are_not_speech() {
        let mut c = chain();
        let mut frame = vec![0.0_f32; 480];
        let report = c.process_in_place(&mut frame).unwrap();
        assert!(!report.is_speech);
        assert_eq!(report.silence_run, 1);
        assert!(report.gain.is_finite());
    }

    // ---- Fade-out ----------------------------------------------------------

    #[test]
    fn fade_ramps_after_silence_threshold() {
        let c = chain();
        assert_eq!(c.fade_factor(false, 5), 1.0);
        assert!((c.fade_factor(false, 6) - 0.9).abs() < 1e-6);
        assert!((c.fade_factor(false, 10) - 0.5).abs() < 1e-6);
        assert_eq!(c.fade_factor(false, 15), 0.0);
        assert_eq!(c.fade_factor(false, 40), 0.0);
        assert_eq!(c.fade_factor(true, 40), 1.0);
    }

    #[test]
    fn long_hum_is_gated_to_silence() {
        let mut c = chain();
        let mut last = None;
        for _ in 0..20 {
            let mut frame = tone(300.0, 0.2, 480);
            let report = c.process_in_place(&mut frame).unwrap();
            if report.fade == 0.0 {
                assert!(frame.iter().all(|&s| s == 0.0));
            }
            last = Some(report);
        }
        let last = last.unwrap();
        assert!(!last.is_speech);
        assert_eq!(last.fade, 0.0);
    }

    #[test]
    fn speech_is_not_faded() {
        let mut c = chain();
        for _ in 0..10 {
            let mut frame = tone(3_000.0, 0.3, 480);
            let report = c.process_in_place(&mut frame).unwrap();
            assert!(report.is_speech);
            assert_eq!(report.fade, 1.0);
        }
    }

    // ---- Spectral subtraction ----------------------------------------------

    #[test]
    fn subtraction_off_by_default_but_profile_calibrates() {
        let mut c = chain();
        for _ in 0..120 {
            let mut frame = tone(300.0, 0.05, 480);
            let report = c.process_in_place(&mut frame).unwrap();
            assert!(!report.subtracted);
        }
        assert_eq!(c.profile_state(), ProfileState::Active);
    }

    #[test]
    fn subtraction_runs_once_profile_is_active() {
        let mut config = DspConfig::default();
        config.spectral_subtraction = true;
        config.noise.max_updates = 2;
        let mut c = DspChain::new(&config, 480).unwrap();

        let mut subtracted = false;
        for _ in 0..10 {
            let mut frame = tone(300.0, 0.05, 480);
            subtracted |= c.process_in_place(&mut frame).unwrap().subtracted;
        }
        assert!(subtracted);
    }

    // ---- Sizing / reset ----------------------------------------------------

    #[test]
    fn large_frames_widen_the_transform() {
        let c = DspChain::new(&DspConfig::default(), 1000).unwrap();
        assert_eq!(c.fft_size(), 1024);
        assert_eq!(chain().fft_size(), 512);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut c = chain();
        let mut frame = vec![0.0_f32; 600];
        assert!(c.process_in_place(&mut frame).is_err());
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut c = chain();
        for _ in 0..20 {
            c.process_in_place(&mut tone(300.0, 0.2, 480)).unwrap();
        }
        c.reset();
        assert_eq!(c.profile_state(), ProfileState::NoProfile);
        assert_eq!(c.gain(), 1.0);

        let mut fresh = chain();
        let mut a = tone(1_000.0, 0.1, 480);
        let mut b = a.clone();
        c.process_in_place(&mut a).unwrap();
        fresh.process_in_place(&mut b).unwrap();
        assert_eq!(a, b);
    }
}
