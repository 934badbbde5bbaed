//! Built-in engine: the DSP chain with spectral subtraction switched on.
//!
//! Stands in for a learned denoiser so the pipeline runs end to end without
//! a model.  Tuning calls map onto the spectral stage:
//!
//! | Engine setting              | Spectral stage                    |
//! |-----------------------------|-----------------------------------|
//! | attenuation limit `d` dB    | spectral floor `10^(−d/20)`       |
//! | post-filter beta `b`        | over-subtraction factor `1 + b`   |

use crate::config::DspConfig;
use crate::dsp::DspChain;

use super::contract::{check_frame_length, DenoiseEngine, EngineError, FrameLengths};

/// Attenuation limit (dB) → fraction of magnitude always kept.
pub fn attenuation_to_floor(db: f32) -> f32 {
    if db <= 0.0 {
        return 1.0;
    }
    10f32.powf(-db / 20.0)
}

pub struct DspEngine {
    config: DspConfig,
    chain: DspChain,
    frame_length: usize,
    floor: f32,
    over_subtraction: f32,
}

impl DspEngine {
    /// Build an engine for `frame_length`-sample frames.
    ///
    /// # Errors
    ///
    /// [`EngineError::Create`] when the DSP settings cannot be realised
    /// (e.g. a non-power-of-two FFT size).
    pub fn create(
        config: &DspConfig,
        frame_length: usize,
        attenuation_limit_db: f32,
    ) -> Result<Self, EngineError> {
        let floor = attenuation_to_floor(attenuation_limit_db);
        let over_subtraction = config.over_subtraction;
        let chain = build_chain(config, frame_length, floor, over_subtraction)?;

        log::debug!(
            "engine: dsp engine ready (frame {frame_length}, fft {}, limit {attenuation_limit_db} dB)",
            chain.fft_size()
        );
        Ok(Self {
            config: config.clone(),
            chain,
            frame_length,
            floor,
            over_subtraction,
        })
    }
}

fn build_chain(
    config: &DspConfig,
    frame_length: usize,
    floor: f32,
    over_subtraction: f32,
) -> Result<DspChain, EngineError> {
    if frame_length == 0 {
        return Err(EngineError::Create("frame length must be > 0".into()));
    }
    let mut chain =
        DspChain::new(config, frame_length).map_err(|e| EngineError::Create(e.to_string()))?;
    chain.set_spectral_subtraction(true);
    chain.set_spectral_floor(floor);
    chain.set_over_subtraction(over_subtraction);
    Ok(chain)
}

impl DenoiseEngine for DspEngine {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn set_attenuation_limit(&mut self, db: f32) {
        self.floor = attenuation_to_floor(db);
        self.chain.set_spectral_floor(self.floor);
    }

    fn set_post_filter_beta(&mut self, beta: f32) {
        self.over_subtraction = 1.0 + beta.max(0.0);
        self.chain.set_over_subtraction(self.over_subtraction);
    }

    fn process_frame(&mut self, input: &[f32]) -> Result<Vec<f32>, EngineError> {
        check_frame_length(self.frame_length, input)?;
        let mut output = input.to_vec();
        self.chain
            .process_in_place(&mut output)
            .map_err(|e| EngineError::Process(e.to_string()))?;
        Ok(output)
    }

    fn frame_lengths(&self) -> FrameLengths {
        FrameLengths::Any
    }

    /// Rebuild the chain: filter history, overlap, noise profile and AGC gain
    /// start over.
    fn reset(&mut self, frame_length: usize) -> Result<(), EngineError> {
        if frame_length == self.frame_length {
            self.chain.reset();
            return Ok(());
        }
        self.chain = build_chain(&self.config, frame_length, self.floor, self.over_subtraction)?;
        self.frame_length = frame_length;
        log::debug!("engine: dsp engine reset (frame {frame_length}, fft {})", self.chain.fft_size());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_maps_to_floor() {
        assert_eq!(attenuation_to_floor(0.0), 1.0);
        assert!((attenuation_to_floor(20.0) - 0.1).abs() < 1e-6);
        assert!((attenuation_to_floor(40.0) - 0.01).abs() < 1e-7);
    }

    #[test]
    fn processes_frames_of_its_length() {
        let mut engine = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        assert_eq!(engine.frame_length(), 480);
        let out = engine.process_frame(&[0.0; 480]).unwrap();
        assert_eq!(out.len(), 480);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn rejects_wrong_length() {
        let mut engine = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        assert!(matches!(
            engine.process_frame(&[0.0; 256]),
            Err(EngineError::FrameLength { expected: 480, actual: 256 })
        ));
    }

    #[test]
    fn bad_fft_size_fails_creation() {
        let config = DspConfig {
            fft_size: 500,
            ..DspConfig::default()
        };
        assert!(matches!(
            DspEngine::create(&config, 256, 20.0),
            Err(EngineError::Create(_))
        ));
        assert!(DspEngine::create(&DspConfig::default(), 0, 20.0).is_err());
    }

    #[test]
    fn reset_switches_length_and_keeps_tuning() {
        let mut engine = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        engine.set_attenuation_limit(40.0);
        assert_eq!(engine.frame_lengths(), FrameLengths::Any);

        engine.reset(256).unwrap();
        assert_eq!(engine.frame_length(), 256);
        assert_eq!(engine.process_frame(&[0.0; 256]).unwrap().len(), 256);
        assert!(engine.process_frame(&[0.0; 480]).is_err());
        assert!((engine.floor - 0.01).abs() < 1e-7);
    }

    #[test]
    fn reset_to_zero_keeps_previous_chain() {
        let mut engine = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        assert!(matches!(engine.reset(0), Err(EngineError::Create(_))));
        assert_eq!(engine.frame_length(), 480);
        assert!(engine.process_frame(&[0.0; 480]).is_ok());
    }

    #[test]
    fn reset_matches_a_fresh_engine() {
        let input: Vec<f32> = (0..256).map(|i| ((i * 37 % 101) as f32 / 101.0 - 0.5) * 0.1).collect();
        let mut fresh = DspEngine::create(&DspConfig::default(), 256, 20.0).unwrap();
        let mut reused = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        for _ in 0..20 {
            reused.process_frame(&vec![0.05; 480]).unwrap();
        }
        reused.reset(256).unwrap();

        for _ in 0..5 {
            assert_eq!(
                fresh.process_frame(&input).unwrap(),
                reused.process_frame(&input).unwrap()
            );
        }
    }

    #[test]
    fn same_length_reset_clears_state() {
        let input: Vec<f32> = (0..480).map(|i| ((i * 37 % 101) as f32 / 101.0 - 0.5) * 0.1).collect();
        let mut engine = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        let first = engine.process_frame(&input).unwrap();
        for _ in 0..20 {
            engine.process_frame(&input).unwrap();
        }
        engine.reset(480).unwrap();
        assert_eq!(engine.process_frame(&input).unwrap(), first);
    }

    #[test]
    fn tuning_does_not_break_processing() {
        let mut engine = DspEngine::create(&DspConfig::default(), 480, 20.0).unwrap();
        engine.set_attenuation_limit(40.0);
        engine.set_post_filter_beta(0.5);
        let input: Vec<f32> = (0..480).map(|i| ((i * 37 % 101) as f32 / 101.0 - 0.5) * 0.1).collect();
        for _ in 0..130 {
            let out = engine.process_frame(&input).unwrap();
            assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        }
    }
}
