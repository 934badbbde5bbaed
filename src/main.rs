//! Application entry point for the live microphone denoiser.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the denoising engine (built-in DSP engine when no model backend
//!    is available) and spawn its worker.
//! 5. Build the [`DenoiseStream`] at the engine's frame length.
//! 6. Start cpal capture and playback; the output callback owns the stream.
//! 7. Log stream statistics until Ctrl-C.

use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use live_denoise::{
    audio::{AudioCapture, AudioChunk, AudioPlayback},
    config::{AppConfig, AppPaths, EngineConfig},
    engine::{create_engine, DenoiseEngine, EngineError},
    pipeline::{new_shared_stats, DenoiseStream, EngineWorker, SharedStats},
};

/// Input blocks buffered between the capture and playback callbacks.
const CHUNK_QUEUE_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Engine selection
// ---------------------------------------------------------------------------

fn build_engine(config: &AppConfig) -> anyhow::Result<Box<dyn DenoiseEngine>> {
    let frame_size = config.stream.frame_size;
    match create_engine(&config.engine, &config.dsp, frame_size) {
        Ok(engine) => Ok(engine),
        Err(e @ EngineError::Unavailable(_)) => {
            if let Some(model) = &config.engine.model_path {
                let resolved = AppPaths::new().resolve_model(model);
                log::warn!("{e} ({}); falling back to the built-in DSP engine", resolved.display());
            }
            let fallback = EngineConfig {
                model_path: None,
                ..config.engine.clone()
            };
            Ok(create_engine(&fallback, &config.dsp, frame_size)?)
        }
        Err(e) => Err(e).context("failed to create denoising engine"),
    }
}

// ---------------------------------------------------------------------------
// Statistics / shutdown
// ---------------------------------------------------------------------------

async fn run_until_shutdown(stats: SharedStats, interval_secs: u64) -> anyhow::Result<()> {
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    if interval_secs == 0 {
        shutdown.await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            _ = ticker.tick() => log::info!("stats: {}", stats.snapshot()),
            res = &mut shutdown => {
                res?;
                return Ok(());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("live-denoise starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    config.validate().context("invalid configuration")?;

    // 3. Tokio runtime (the engine worker and the stats ticker)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Engine + worker
    let stats = new_shared_stats();
    let (stream_config, link) = if config.stream.mode.uses_engine() {
        let worker = EngineWorker::new(build_engine(&config)?);
        let stream_config = worker.stream_config(&config.stream);
        let (link, port) = worker.channel(stream_config.pending_depth);
        rt.spawn(worker.run(port));
        (stream_config, Some(link))
    } else {
        (config.stream.clone(), None)
    };

    // 5. Stream
    let mut stream = DenoiseStream::new(&stream_config, &config.dsp, link, stats.clone())
        .context("failed to build denoise stream")?;
    let (frame_size, mode) = (stream.frame_size(), stream.mode());

    // 6. Devices
    let sample_rate = config.stream.sample_rate;
    let capture = AudioCapture::new(config.audio.input_device.as_deref(), sample_rate)?;
    let playback = AudioPlayback::new(config.audio.output_device.as_deref(), sample_rate)?;

    let (chunk_tx, chunk_rx) = mpsc::sync_channel::<AudioChunk>(CHUNK_QUEUE_DEPTH);
    let input = capture.start(chunk_tx)?;
    let output = playback.start(move |out: &mut [f32]| {
        while let Ok(chunk) = chunk_rx.try_recv() {
            stream.process(&chunk.samples, &mut []);
        }
        stream.process(&[], out);
    })?;

    log::info!(
        "Denoising {} Hz mono, frame {} samples, mode {}",
        sample_rate,
        frame_size,
        mode.label()
    );

    // 7. Run until Ctrl-C
    rt.block_on(run_until_shutdown(stats.clone(), config.audio.stats_interval_secs))?;

    drop(input);
    drop(output);
    log::info!("live-denoise stopped: {}", stats.snapshot());
    Ok(())
}
