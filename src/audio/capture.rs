//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin streaming mono [`AudioChunk`]s over a
//! bounded channel.  The returned [`StreamHandle`] is a RAII guard; dropping
//! it stops the underlying cpal stream.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use thiserror::Error;

use super::mix::downmix_to_mono;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One input block from the cpal callback, already downmixed to mono.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz.
    pub sample_rate: u32,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps a cpal stream (input or output) alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

impl StreamHandle {
    pub(crate) fn new(stream: cpal::Stream) -> Self {
        Self { _stream: stream }
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device '{0}' not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::mpsc;
/// use live_denoise::audio::{AudioCapture, AudioChunk};
///
/// let (tx, rx) = mpsc::sync_channel::<AudioChunk>(64);
/// let capture = AudioCapture::new(None, 48_000).unwrap();
/// let _handle = capture.start(tx).unwrap();
/// // `_handle` keeps the stream alive; drop it to stop recording.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl AudioCapture {
    /// Open `device_name` (or the default input device) at `sample_rate`.
    ///
    /// The channel count comes from the device's default configuration;
    /// chunks are downmixed before they leave the callback.
    ///
    /// # Errors
    ///
    /// [`CaptureError::NoDevice`] / [`CaptureError::DeviceNotFound`] when no
    /// matching device exists, or [`CaptureError::DefaultConfig`] when the
    /// device cannot report a default stream configuration.
    pub fn new(device_name: Option<&str>, sample_rate: u32) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match device_name {
            None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
        };

        let supported = device.default_input_config()?;
        if supported.sample_rate().0 != sample_rate {
            log::warn!(
                "capture: device default rate is {} Hz, requesting {sample_rate} Hz",
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

    /// Start recording and send mono [`AudioChunk`]s to `tx`.
    ///
    /// The callback never blocks: when the channel is full the chunk is
    /// dropped and logged.
    ///
    /// # Errors
    ///
    /// [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`] if the
    /// platform rejects the stream configuration.
    pub fn start(&self, tx: mpsc::SyncSender<AudioChunk>) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.config.sample_rate.0;
        let channels = self.config.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: downmix_to_mono(data, channels),
                    sample_rate,
                };
                if let Err(mpsc::TrySendError::Full(_)) = tx.try_send(chunk) {
                    log::warn!("capture: chunk queue full, dropping input block");
                }
            },
            |err: cpal::StreamError| {
                log::error!("capture: cpal stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::info!("capture: started ({sample_rate} Hz, {channels} ch)");
        Ok(StreamHandle::new(stream))
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Device channel count before downmixing.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
