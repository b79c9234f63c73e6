//! JSON framing for bridge messages
//!
//! Every WebSocket text message carries exactly one JSON object; there is
//! no sub-framing or multiplexing.

use crate::messages::{InboundFrame, OutboundFrame};

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid {event} payload: {source}")]
    InvalidPayload {
        event: &'static str,
        source: serde_json::Error,
    },

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Stream line exceeds {max} bytes")]
    LineTooLong { max: usize },
}

/// Decode one inbound text frame
pub fn decode_inbound(text: &str) -> Result<InboundFrame, CodecError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let value: serde_json::Value = serde_json::from_str(text)?;
    InboundFrame::from_value(value)
}

/// Encode one outbound frame as a JSON text message
pub fn encode_outbound(frame: &OutboundFrame) -> Result<String, CodecError> {
    let text = serde_json::to_string(frame)?;

    if text.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    Ok(text)
}
