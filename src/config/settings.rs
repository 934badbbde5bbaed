//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the
//! real-time and processing sides independently.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::dsp::{AgcConfig, BiquadCoeffs, NoiseProfileConfig, VadConfig};
use crate::pipeline::PipelineMode;

// ---------------------------------------------------------------------------
// StreamConfig
// ---------------------------------------------------------------------------

/// Framing and queueing for the live stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Stream sample rate in Hz.  Mono, agreed once at start-up.
    pub sample_rate: u32,
    /// Samples per frame handed to the engine (480 = 10 ms at 48 kHz).
    pub frame_size: usize,
    /// Completed frames kept for playback before the oldest is dropped.
    pub output_queue_depth: usize,
    /// Frames allowed in flight to the processing side before submissions
    /// are rejected and replaced with silence.
    pub pending_depth: usize,
    /// Which path frames take through the pipeline.
    pub mode: PipelineMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frame_size: 480,
            output_queue_depth: 32,
            pending_depth: 16,
            mode: PipelineMode::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// DspConfig
// ---------------------------------------------------------------------------

/// Settings for the DSP preprocessing chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DspConfig {
    /// Transform size (power of two).  Widened automatically when a frame
    /// is longer.
    pub fft_size: usize,
    /// Apply spectral subtraction once the noise profile is calibrated.
    /// Profile tracking runs either way.
    pub spectral_subtraction: bool,
    /// Multiple of the noise profile removed from each bin (> 1).
    pub over_subtraction: f32,
    /// Fraction of the original magnitude always kept per bin.
    pub spectral_floor: f32,
    /// Silent frames tolerated before the fade-out starts.
    pub fade_after_frames: usize,
    /// Gain removed per additional silent frame during the fade-out.
    pub fade_step: f32,
    /// High-pass biquad coefficients.
    pub highpass: BiquadCoeffs,
    pub vad: VadConfig,
    pub noise: NoiseProfileConfig,
    pub agc: AgcConfig,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            spectral_subtraction: false,
            over_subtraction: 2.0,
            spectral_floor: 0.1,
            fade_after_frames: 5,
            fade_step: 0.1,
            highpass: BiquadCoeffs::default(),
            vad: VadConfig::default(),
            noise: NoiseProfileConfig::default(),
            agc: AgcConfig::default(),
        }
    }
}

impl DspConfig {
    /// Reject settings the chain cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            bail!("dsp.fft_size must be a power of two, got {}", self.fft_size);
        }
        if !(0.0..=1.0).contains(&self.spectral_floor) {
            bail!("dsp.spectral_floor must be in [0, 1], got {}", self.spectral_floor);
        }
        if self.over_subtraction < 0.0 {
            bail!("dsp.over_subtraction must be >= 0, got {}", self.over_subtraction);
        }
        if !(0.0..=1.0).contains(&self.noise.alpha) {
            bail!("dsp.noise.alpha must be in [0, 1], got {}", self.noise.alpha);
        }
        if !(0.0..1.0).contains(&self.agc.smoothing) {
            bail!("dsp.agc.smoothing must be in [0, 1), got {}", self.agc.smoothing);
        }
        if self.agc.min_gain <= 0.0 || self.agc.min_gain > self.agc.max_gain {
            bail!(
                "dsp.agc gain range [{}, {}] is invalid",
                self.agc.min_gain,
                self.agc.max_gain
            );
        }
        if self.agc.epsilon <= 0.0 {
            bail!("dsp.agc.epsilon must be > 0");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Settings for the denoising engine on the processing side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model file for a learned engine.  `None` selects the built-in DSP
    /// engine.
    pub model_path: Option<PathBuf>,
    /// Maximum attenuation in dB.
    pub attenuation_limit_db: f32,
    /// Post-filter strength (0 disables).
    pub post_filter_beta: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            attenuation_limit_db: 20.0,
            post_filter_beta: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Host device selection and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
    /// Output device name; `None` means the system default.
    pub output_device: Option<String>,
    /// Seconds between stream statistics log lines (0 disables).
    pub stats_interval_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            stats_interval_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use live_denoise::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Framing, queue depths and pipeline mode.
    pub stream: StreamConfig,
    /// DSP chain settings.
    pub dsp: DspConfig,
    /// Denoising engine settings.
    pub engine: EngineConfig,
    /// Host device settings.
    pub audio: AudioConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            dsp: DspConfig::default(),
            engine: EngineConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check cross-field constraints before the stream is built.
    pub fn validate(&self) -> Result<()> {
        if self.stream.frame_size == 0 {
            bail!("stream.frame_size must be > 0");
        }
        if self.stream.output_queue_depth == 0 || self.stream.pending_depth == 0 {
            bail!("stream queue depths must be > 0");
        }
        self.dsp.validate()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// A default `AppConfig` survives a TOML round trip.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        // StreamConfig
        assert_eq!(original.stream.sample_rate, loaded.stream.sample_rate);
        assert_eq!(original.stream.frame_size, loaded.stream.frame_size);
        assert_eq!(original.stream.mode, loaded.stream.mode);

        // DspConfig
        assert_eq!(original.dsp.fft_size, loaded.dsp.fft_size);
        assert_eq!(original.dsp.highpass, loaded.dsp.highpass);
        assert_eq!(original.dsp.vad, loaded.dsp.vad);
        assert_eq!(original.dsp.noise, loaded.dsp.noise);
        assert_eq!(original.dsp.agc, loaded.dsp.agc);

        // EngineConfig
        assert_eq!(original.engine.model_path, loaded.engine.model_path);
        assert_eq!(
            original.engine.attenuation_limit_db,
            loaded.engine.attenuation_limit_db
        );

        // AudioConfig
        assert_eq!(original.audio.input_device, loaded.audio.input_device);
        assert_eq!(
            original.audio.stats_interval_secs,
            loaded.audio.stats_interval_secs
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.stream.frame_size, 480);
        assert_eq!(config.dsp.fft_size, 512);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.stream.sample_rate, 48_000);
        assert_eq!(cfg.stream.frame_size, 480);
        assert_eq!(cfg.stream.mode, PipelineMode::Engine);
        assert!(!cfg.dsp.spectral_subtraction);
        assert_eq!(cfg.dsp.over_subtraction, 2.0);
        assert_eq!(cfg.dsp.spectral_floor, 0.1);
        assert_eq!(cfg.dsp.vad.energy_threshold, 0.01);
        assert_eq!(cfg.dsp.vad.zcr_threshold, 0.1);
        assert_eq!(cfg.dsp.noise.max_updates, 100);
        assert_eq!(cfg.dsp.agc.target_rms, 0.05);
        assert_eq!(cfg.dsp.agc.max_gain, 10.0);
        assert!(cfg.engine.model_path.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.stream.frame_size = 256;
        cfg.stream.mode = PipelineMode::DspOnly;
        cfg.dsp.spectral_subtraction = true;
        cfg.dsp.noise.alpha = 0.2;
        cfg.engine.model_path = Some(PathBuf::from("/models/denoise.tar.gz"));
        cfg.audio.output_device = Some("Headphones".into());

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.stream.frame_size, 256);
        assert_eq!(loaded.stream.mode, PipelineMode::DspOnly);
        assert!(loaded.dsp.spectral_subtraction);
        assert_eq!(loaded.dsp.noise.alpha, 0.2);
        assert_eq!(
            loaded.engine.model_path,
            Some(PathBuf::from("/models/denoise.tar.gz"))
        );
        assert_eq!(loaded.audio.output_device.as_deref(), Some("Headphones"));
    }

    // ---- Validation ---

    #[test]
    fn validate_rejects_bad_fft_size() {
        let mut cfg = AppConfig::default();
        cfg.dsp.fft_size = 500;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_gain_range() {
        let mut cfg = DspConfig::default();
        cfg.agc.min_gain = 20.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_frame_size() {
        let mut cfg = AppConfig::default();
        cfg.stream.frame_size = 0;
        assert!(cfg.validate().is_err());
    }
}
