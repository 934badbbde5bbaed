//! `DenoiseStream`, the object the host's real-time callback drives.
//!
//! # Flow
//!
//! ```text
//! process(input, output)
//!   │
//!   ├─ FrameAssembler::push(input)          0..n whole frames
//!   │     └─ per frame (by PipelineMode)
//!   │          ├─ DspOnly        DspChain ──────────────▶ PlaybackDrain
//!   │          ├─ DspThenEngine  DspChain ─▶ Exchange::submit
//!   │          └─ Engine                    Exchange::submit
//!   │
//!   ├─ Exchange::poll_results()             resolved frames ─▶ PlaybackDrain
//!   └─ PlaybackDrain::fill(output)          always fills `output` completely
//! ```
//!
//! Nothing here blocks or returns an error to the callback.  Engine trouble
//! shows up as silence plus a [`StreamStats`](super::StreamStats) counter.

use crate::audio::{AudioFrame, FillReport, FrameAssembler, PlaybackDrain};
use crate::config::{DspConfig, StreamConfig};
use crate::dsp::DspChain;

use super::control::{validate_frame_size, validate_queue_depth, ControlMessage, StreamError};
use super::exchange::{enqueue_output, EngineLink, Exchange};
use super::state::{PipelineMode, SharedStats};

pub struct DenoiseStream {
    mode: PipelineMode,
    dsp_config: DspConfig,
    output_queue_depth: usize,
    assembler: FrameAssembler,
    chain: Option<DspChain>,
    exchange: Option<Exchange>,
    drain: PlaybackDrain,
    stats: SharedStats,
}

impl DenoiseStream {
    /// Build a stream for `config.mode`.
    ///
    /// # Errors
    ///
    /// * [`StreamError::InvalidFrameSize`] for a zero or oversized frame.
    /// * [`StreamError::InvalidQueueDepth`] for a zero `output_queue_depth`.
    /// * [`StreamError::EngineLinkMissing`] when the mode submits to an engine
    ///   and `link` is `None`.
    /// * [`StreamError::Dsp`] when the DSP chain cannot be built.
    pub fn new(
        config: &StreamConfig,
        dsp: &DspConfig,
        link: Option<EngineLink>,
        stats: SharedStats,
    ) -> Result<Self, StreamError> {
        let frame_size = validate_frame_size(config.frame_size as i64)?;
        let output_queue_depth = validate_queue_depth(config.output_queue_depth)?;
        let mode = config.mode;

        let chain = if mode.uses_dsp() {
            Some(DspChain::new(dsp, frame_size)?)
        } else {
            None
        };

        let exchange = match (mode.uses_engine(), link) {
            (true, Some(link)) => Some(Exchange::new(
                link,
                frame_size,
                config.pending_depth,
                stats.clone(),
            )),
            (true, None) => return Err(StreamError::EngineLinkMissing(mode.label())),
            (false, Some(_)) => {
                log::debug!("stream: mode {} ignores the engine link", mode.label());
                None
            }
            (false, None) => None,
        };

        log::info!(
            "stream: ready (mode {}, frame {frame_size}, {} Hz)",
            mode.label(),
            config.sample_rate
        );

        Ok(Self {
            mode,
            dsp_config: dsp.clone(),
            output_queue_depth,
            assembler: FrameAssembler::new(frame_size),
            chain,
            exchange,
            drain: PlaybackDrain::new(output_queue_depth),
            stats,
        })
    }

    // -----------------------------------------------------------------------
    // Real-time entry point
    // -----------------------------------------------------------------------

    /// Consume one host input block and fill one host output block.
    ///
    /// `input` and `output` may have any length, independent of each other
    /// and of the frame size.  `output` is always written in full.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> FillReport {
        let Self {
            mode,
            assembler,
            chain,
            exchange,
            drain,
            stats,
            ..
        } = self;

        let assembled = assembler.push(input, |frame| {
            let frame = match chain.as_mut() {
                Some(chain) => run_chain(chain, frame),
                None => frame,
            };
            match exchange.as_mut() {
                Some(exchange) if mode.uses_engine() => {
                    exchange.submit(frame);
                }
                _ => enqueue_output(drain, stats, frame),
            }
        });
        if assembled > 0 {
            stats.add_assembled(assembled as u64);
        }

        if let Some(exchange) = exchange.as_mut() {
            exchange.poll_results(drain);
        }

        let report = drain.fill(output);
        if report.is_underrun() {
            stats.record_underrun(report.silence as u64);
        }
        report
    }

    // -----------------------------------------------------------------------
    // Control
    // -----------------------------------------------------------------------

    pub fn handle_control(&mut self, message: ControlMessage) -> Result<(), StreamError> {
        match message {
            ControlMessage::Init { frame_size } => self.reinit(frame_size),
            ControlMessage::EngineResult { output } => {
                match self.exchange.as_mut() {
                    Some(exchange) => exchange.deliver(output, &mut self.drain),
                    None => {
                        self.stats.add_stale(1);
                        log::debug!("stream: engine result in mode {}, dropped", self.mode.label());
                    }
                }
                Ok(())
            }
        }
    }

    /// Parse and apply a JSON control message.
    pub fn handle_json(&mut self, text: &str) -> Result<(), StreamError> {
        let message = ControlMessage::from_json(text)?;
        self.handle_control(message)
    }

    /// Re-initialize every piece of mutable state for `frame_size`, the
    /// engine's included.
    ///
    /// The new assembler, chain and drain are built and the engine reset is
    /// queued before anything is replaced, so on error the stream keeps
    /// running unchanged.  A partially assembled frame is discarded, along
    /// with queued output and every frame still in flight; late results for
    /// those frames are dropped as stale.
    pub fn reinit(&mut self, frame_size: i64) -> Result<(), StreamError> {
        let frame_size = match validate_frame_size(frame_size) {
            Ok(size) => size,
            Err(e) => {
                log::warn!(
                    "stream: {e}; keeping frame size {}",
                    self.assembler.frame_size()
                );
                return Err(e);
            }
        };

        let chain = if self.mode.uses_dsp() {
            Some(DspChain::new(&self.dsp_config, frame_size)?)
        } else {
            None
        };
        let assembler = FrameAssembler::new(frame_size);
        let drain = PlaybackDrain::new(validate_queue_depth(self.output_queue_depth)?);

        if let Some(exchange) = self.exchange.as_mut() {
            if let Err(e) = exchange.reset(frame_size) {
                log::warn!(
                    "stream: {e}; keeping frame size {}",
                    self.assembler.frame_size()
                );
                return Err(e);
            }
        }

        let dropped = self.assembler.buffered();
        self.assembler = assembler;
        self.chain = chain;
        self.drain = drain;
        self.stats.add_reinits(1);

        log::info!("stream: re-initialised for frame size {frame_size} ({dropped} buffered samples dropped)");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn mode(&self) -> PipelineMode {
        self.mode
    }

    pub fn frame_size(&self) -> usize {
        self.assembler.frame_size()
    }

    /// Input samples waiting for the next frame boundary.
    pub fn buffered_samples(&self) -> usize {
        self.assembler.buffered()
    }

    /// Completed frames waiting for playback.
    pub fn queued_frames(&self) -> usize {
        self.drain.queued_frames()
    }

    /// Frames submitted and not yet resolved.
    pub fn pending_frames(&self) -> usize {
        self.exchange.as_ref().map_or(0, Exchange::pending_frames)
    }

    /// The real-time DSP chain, present in [`PipelineMode::DspOnly`] and
    /// [`PipelineMode::DspThenEngine`].
    pub fn dsp_chain_mut(&mut self) -> Option<&mut DspChain> {
        self.chain.as_mut()
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }
}

/// Run the chain over one frame; a frame the chain rejects becomes silence.
fn run_chain(chain: &mut DspChain, frame: AudioFrame) -> AudioFrame {
    let len = frame.len();
    match chain.preprocess(frame) {
        Ok(frame) => frame,
        Err(e) => {
            log::error!("stream: dsp chain failed ({e}); substituting silence");
            AudioFrame::silent(len)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
