//! Real-time stream and the hand-off to the processing side.
//!
//! # Architecture
//!
//! ```text
//!  real-time context (host callback)          processing context (tokio)
//! ┌───────────────────────────────────┐      ┌────────────────────────────┐
//! │ DenoiseStream::process()          │      │ EngineWorker::run()        │
//! │   FrameAssembler                  │ jobs │   spawn_blocking(          │
//! │   DspChain (optional)             │─────▶│     DenoiseEngine::        │
//! │   Exchange::submit   (try_send)   │      │       process_frame)       │
//! │   Exchange::poll_results (try_recv)◀─────│                            │
//! │   PlaybackDrain::fill             │result└────────────────────────────┘
//! └───────────────────────────────────┘
//!
//! StreamStats (atomics) ←── read by the host for diagnostics
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use live_denoise::config::AppConfig;
//! use live_denoise::engine::create_engine;
//! use live_denoise::pipeline::{new_shared_stats, DenoiseStream, EngineWorker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let engine = create_engine(&config.engine, &config.dsp, config.stream.frame_size).unwrap();
//!
//!     let worker = EngineWorker::new(engine);
//!     let stream_config = worker.stream_config(&config.stream);
//!     let (link, port) = worker.channel(stream_config.pending_depth);
//!     tokio::spawn(worker.run(port));
//!
//!     let mut stream =
//!         DenoiseStream::new(&stream_config, &config.dsp, Some(link), new_shared_stats()).unwrap();
//!
//!     // Inside the host audio callback:
//!     let mut output = vec![0.0; 256];
//!     stream.process(&[0.0; 256], &mut output);
//! }
//! ```

pub mod control;
pub mod exchange;
pub mod state;
pub mod stream;
pub mod worker;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use control::{
    validate_frame_size, validate_queue_depth, ControlMessage, StreamError, MAX_FRAME_SIZE,
};
pub use exchange::{
    engine_channel, EngineJob, EngineLink, EnginePort, Exchange, FrameHandle, FrameJob,
    FrameResult,
};
pub use state::{new_shared_stats, PipelineMode, SharedStats, StatsSnapshot, StreamStats};
pub use stream::DenoiseStream;
pub use worker::{EngineWorker, SharedEngine};
