//! Speaker output via `cpal`.
//!
//! [`AudioPlayback::start`] runs a caller-supplied render closure on the
//! cpal output thread.  The closure fills a mono block; playback copies it
//! to every device channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::capture::StreamHandle;
use super::mix::upmix_into;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device found on the default audio host")]
    NoDevice,

    #[error("output device '{0}' not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub struct AudioPlayback {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl AudioPlayback {
    /// Open `device_name` (or the default output device) at `sample_rate`.
    pub fn new(device_name: Option<&str>, sample_rate: u32) -> Result<Self, PlaybackError> {
        let host = cpal::default_host();
        let device = match device_name {
            None => host.default_output_device().ok_or(PlaybackError::NoDevice)?,
            Some(name) => host
                .output_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| PlaybackError::DeviceNotFound(name.to_string()))?,
        };

        let supported = device.default_output_config()?;
        if supported.sample_rate().0 != sample_rate {
            log::warn!(
                "playback: device default rate is {} Hz, requesting {sample_rate} Hz",
                supported.sample_rate().0
            );
        }
        let config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self { device, config })
    }

    /// Start the output stream, calling `render` once per device block.
    ///
    /// `render` receives a zeroed mono buffer with one sample per device
    /// frame and must fill it without blocking.
    pub fn start<F>(&self, mut render: F) -> Result<StreamHandle, PlaybackError>
    where
        F: FnMut(&mut [f32]) + Send + 'static,
    {
        let channels = self.config.channels;
        let mut mono: Vec<f32> = Vec::new();

        let stream = self.device.build_output_stream(
            &self.config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels.max(1) as usize;
                // Grows only until it reaches the largest block size seen.
                mono.clear();
                mono.resize(frames, 0.0);
                render(&mut mono);
                data.fill(0.0);
                upmix_into(&mono, data, channels);
            },
            |err: cpal::StreamError| {
                log::error!("playback: cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::info!(
            "playback: started ({} Hz, {channels} ch)",
            self.config.sample_rate.0
        );
        Ok(StreamHandle::new(stream))
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}
