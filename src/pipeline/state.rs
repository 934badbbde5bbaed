//! Pipeline mode and shared stream diagnostics.
//!
//! [`PipelineMode`] selects which path a frame takes between the assembler
//! and the output queue.
//!
//! [`StreamStats`] is a set of monotonically increasing counters written by
//! the real-time callback and read from anywhere.  Every field is an atomic,
//! so the audio thread never takes a lock to record an event.
//! [`SharedStats`] is a type alias for `Arc<StreamStats>`, cheap to clone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PipelineMode
// ---------------------------------------------------------------------------

/// Alternative pipeline configurations.
///
/// | Variant        | Real-time side          | Processing side |
/// |----------------|-------------------------|-----------------|
/// | Engine         | assemble → submit       | engine          |
/// | DspThenEngine  | assemble → DSP → submit | engine          |
/// | DspOnly        | assemble → DSP → queue  | unused          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineMode {
    /// Frames go straight to the denoising engine.
    Engine,
    /// The DSP chain pre-processes frames before the engine sees them.
    DspThenEngine,
    /// The DSP chain alone; nothing leaves the real-time side.
    DspOnly,
}

impl PipelineMode {
    /// ```
    /// use live_denoise::pipeline::PipelineMode;
    ///
    /// assert!(PipelineMode::Engine.uses_engine());
    /// assert!(PipelineMode::DspThenEngine.uses_engine());
    /// assert!(!PipelineMode::DspOnly.uses_engine());
    /// ```
    pub fn uses_engine(&self) -> bool {
        !matches!(self, PipelineMode::DspOnly)
    }

    pub fn uses_dsp(&self) -> bool {
        !matches!(self, PipelineMode::Engine)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineMode::Engine => "engine",
            PipelineMode::DspThenEngine => "dsp+engine",
            PipelineMode::DspOnly => "dsp",
        }
    }
}

impl Default for PipelineMode {
    fn default() -> Self {
        PipelineMode::Engine
    }
}

// ---------------------------------------------------------------------------
// StreamStats
// ---------------------------------------------------------------------------

/// Lock-free stream counters.
#[derive(Debug, Default)]
pub struct StreamStats {
    frames_assembled: AtomicU64,
    frames_submitted: AtomicU64,
    frames_completed: AtomicU64,
    engine_failures: AtomicU64,
    frames_discarded: AtomicU64,
    frames_rejected: AtomicU64,
    stale_results: AtomicU64,
    output_overflows: AtomicU64,
    underrun_callbacks: AtomicU64,
    underrun_samples: AtomicU64,
    reinits: AtomicU64,
}

/// Cheap-to-clone handle to the counters.
pub type SharedStats = Arc<StreamStats>;

/// Create a fresh [`SharedStats`].
pub fn new_shared_stats() -> SharedStats {
    Arc::new(StreamStats::default())
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        pub fn $record(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl StreamStats {
    counter!(add_assembled, frames_assembled);
    counter!(add_submitted, frames_submitted);
    counter!(add_completed, frames_completed);
    counter!(add_engine_failures, engine_failures);
    counter!(add_discarded, frames_discarded);
    counter!(add_rejected, frames_rejected);
    counter!(add_stale, stale_results);
    counter!(add_output_overflows, output_overflows);
    counter!(add_reinits, reinits);

    /// Record one output callback that had to be padded with `samples` zeros.
    pub fn record_underrun(&self, samples: u64) {
        self.underrun_callbacks.fetch_add(1, Ordering::Relaxed);
        self.underrun_samples.fetch_add(samples, Ordering::Relaxed);
    }

    /// Copy every counter.  Individual loads are relaxed, so a snapshot taken
    /// while the stream runs may mix values from adjacent callbacks.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_assembled: load(&self.frames_assembled),
            frames_submitted: load(&self.frames_submitted),
            frames_completed: load(&self.frames_completed),
            engine_failures: load(&self.engine_failures),
            frames_discarded: load(&self.frames_discarded),
            frames_rejected: load(&self.frames_rejected),
            stale_results: load(&self.stale_results),
            output_overflows: load(&self.output_overflows),
            underrun_callbacks: load(&self.underrun_callbacks),
            underrun_samples: load(&self.underrun_samples),
            reinits: load(&self.reinits),
        }
    }
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_assembled: u64,
    pub frames_submitted: u64,
    pub frames_completed: u64,
    pub engine_failures: u64,
    /// In-flight frames abandoned by a re-initialization.
    pub frames_discarded: u64,
    pub frames_rejected: u64,
    pub stale_results: u64,
    pub output_overflows: u64,
    pub underrun_callbacks: u64,
    pub underrun_samples: u64,
    pub reinits: u64,
}

impl StatsSnapshot {
    /// Frames submitted and not yet completed, failed or discarded.
    pub fn in_flight(&self) -> u64 {
        self.frames_submitted
            .saturating_sub(self.frames_completed + self.engine_failures + self.frames_discarded)
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "assembled={} submitted={} completed={} failed={} discarded={} rejected={} \
             stale={} overflow={} underruns={} ({} samples) reinits={}",
            self.frames_assembled,
            self.frames_submitted,
            self.frames_completed,
            self.engine_failures,
            self.frames_discarded,
            self.frames_rejected,
            self.stale_results,
            self.output_overflows,
            self.underrun_callbacks,
            self.underrun_samples,
            self.reinits,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
