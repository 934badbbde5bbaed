//! Control messages a host sends to a running stream.
//!
//! Wire format is JSON, tagged by `kind`:
//!
//! ```json
//! {"kind": "init", "frameSize": 480}
//! {"kind": "engineResult", "output": [0.0, 0.01, …]}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dsp::FftError;

/// Largest frame a stream accepts (≈ 1.4 s at 48 kHz).
pub const MAX_FRAME_SIZE: usize = 65_536;

// ---------------------------------------------------------------------------
// StreamError
// ---------------------------------------------------------------------------

/// Errors returned to the host by stream configuration calls.  None of them
/// leave the stream in a half-configured state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// Frame sizes must be positive integers no larger than [`MAX_FRAME_SIZE`].
    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(i64),

    /// The control message could not be parsed.
    #[error("Invalid control message: {0}")]
    InvalidMessage(String),

    /// The DSP chain could not be built for the requested frame size.
    #[error("DSP setup failed: {0}")]
    Dsp(#[from] FftError),

    /// The pipeline mode needs an engine but none was linked.
    #[error("Pipeline mode {0} requires an engine link")]
    EngineLinkMissing(&'static str),

    /// The output queue must hold at least one frame.
    #[error("Invalid output queue depth: {0}")]
    InvalidQueueDepth(usize),

    /// The linked engine runs at a fixed frame length.
    #[error("Engine cannot run {requested}-sample frames (fixed at {fixed})")]
    EngineFrameSize { requested: usize, fixed: usize },

    /// The job channel had no room for the engine reset; retry later.
    #[error("Engine busy, re-initialization not queued")]
    EngineBusy,
}

/// Check a host-supplied frame size.
pub fn validate_frame_size(frame_size: i64) -> Result<usize, StreamError> {
    match usize::try_from(frame_size) {
        Ok(size) if size > 0 && size <= MAX_FRAME_SIZE => Ok(size),
        _ => Err(StreamError::InvalidFrameSize(frame_size)),
    }
}

/// Check the output queue depth (in frames).
pub fn validate_queue_depth(depth: usize) -> Result<usize, StreamError> {
    if depth == 0 {
        return Err(StreamError::InvalidQueueDepth(depth));
    }
    Ok(depth)
}

// ---------------------------------------------------------------------------
// ControlMessage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ControlMessage {
    /// Re-initialize the stream for a new frame size.
    #[serde(rename_all = "camelCase")]
    Init { frame_size: i64 },

    /// Engine output for the oldest frame still in flight.
    EngineResult { output: Vec<f32> },
}

impl ControlMessage {
    /// Parse a JSON control message.
    ///
    /// ```
    /// use live_denoise::pipeline::ControlMessage;
    ///
    /// let msg = ControlMessage::from_json(r#"{"kind":"init","frameSize":480}"#).unwrap();
    /// assert_eq!(msg, ControlMessage::Init { frame_size: 480 });
    /// ```
    pub fn from_json(text: &str) -> Result<Self, StreamError> {
        serde_json::from_str(text).map_err(|e| StreamError::InvalidMessage(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StreamError> {
        serde_json::to_string(self).map_err(|e| StreamError::InvalidMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Parsing ---

    #[test]
    fn parses_init() {
        let msg = ControlMessage::from_json(r#"{"kind":"init","frameSize":256}"#).unwrap();
        assert_eq!(msg, ControlMessage::Init { frame_size: 256 });
    }

    #[test]
    fn parses_engine_result() {
        let msg =
            ControlMessage::from_json(r#"{"kind":"engineResult","output":[0.5,-0.25]}"#).unwrap();
        assert_eq!(
            msg,
            ControlMessage::EngineResult {
                output: vec![0.5, -0.25]
            }
        );
    }

    #[test]
    fn non_integer_frame_size_is_invalid_message() {
        let err = ControlMessage::from_json(r#"{"kind":"init","frameSize":480.5}"#).unwrap_err();
        assert!(matches!(err, StreamError::InvalidMessage(_)));
    }

    #[test]
    fn unknown_kind_is_invalid_message() {
        let err = ControlMessage::from_json(r#"{"kind":"shutdown"}"#).unwrap_err();
        assert!(matches!(err, StreamError::InvalidMessage(_)));
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let text = ControlMessage::Init { frame_size: 480 }.to_json().unwrap();
        assert!(text.contains(r#""kind":"init""#));
        assert!(text.contains(r#""frameSize":480"#));
    }

    // --- Frame size validation ---

    #[test]
    fn frame_size_bounds() {
        assert_eq!(validate_frame_size(480), Ok(480));
        assert_eq!(validate_frame_size(1), Ok(1));
        assert_eq!(validate_frame_size(0), Err(StreamError::InvalidFrameSize(0)));
        assert_eq!(validate_frame_size(-480), Err(StreamError::InvalidFrameSize(-480)));
        assert!(validate_frame_size(MAX_FRAME_SIZE as i64 + 1).is_err());
    }

    #[test]
    fn queue_depth_must_hold_a_frame() {
        assert_eq!(validate_queue_depth(1), Ok(1));
        assert_eq!(validate_queue_depth(32), Ok(32));
        assert_eq!(validate_queue_depth(0), Err(StreamError::InvalidQueueDepth(0)));
    }
}
