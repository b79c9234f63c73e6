//! Framing for the `ask_stream` chat endpoint
//!
//! The response body is a sequence of newline-delimited `data: <json>`
//! lines. Lines without the `data:` prefix and empty payloads are skipped.

use bytes::BytesMut;
use serde::Deserialize;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::codec::CodecError;

/// Path of the streaming chat endpoint
pub const ASK_STREAM_PATH: &str = "/api/chat/ask_stream";

/// HTTP status returned when a job is already running
pub const JOB_ACTIVE_STATUS: u16 = 409;

/// Maximum length of a single stream line (1 MB)
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Typed stream payload, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Cumulative assistant output so far
    PartialAssistant {
        #[serde(default)]
        content: String,
    },
    /// End of the answer, with optional throughput in tokens/sec
    End {
        #[serde(default, deserialize_with = "lenient_tps")]
        tps: Option<f64>,
    },
    /// Any other payload type
    #[serde(other)]
    Other,
}

/// Non-numeric throughput values are treated as absent
fn lenient_tps<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

/// One decoded `data:` line
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Payload parsed as JSON
    Event(StreamEvent),
    /// Payload that was not JSON, passed through verbatim
    Raw(String),
}

/// Parse a single line, returning `None` for lines that carry nothing
fn parse_line(line: &str) -> Option<StreamChunk> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(_) => return Some(StreamChunk::Raw(payload.to_string())),
    };

    let event = StreamEvent::deserialize(value).unwrap_or(StreamEvent::Other);
    Some(StreamChunk::Event(event))
}

impl From<LinesCodecError> for CodecError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => CodecError::LineTooLong {
                max: MAX_LINE_LENGTH,
            },
            LinesCodecError::Io(e) => CodecError::Io(e),
        }
    }
}

/// Decoder turning an `ask_stream` body into [`StreamChunk`]s
pub struct AskStreamCodec {
    lines: LinesCodec,
}

impl AskStreamCodec {
    pub fn new() -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        }
    }
}

impl Default for AskStreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AskStreamCodec {
    type Item = StreamChunk;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(line) = self.lines.decode(src)? {
            if let Some(chunk) = parse_line(&line) {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(line) = self.lines.decode_eof(src)? {
            if let Some(chunk) = parse_line(&line) {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }
}

/// Errors reported before a stream body is read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("A job is already active")]
    JobAlreadyActive,

    #[error("Unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Check the response status of an `ask_stream` request
pub fn check_ask_stream_status(status: u16) -> Result<(), StreamError> {
    match status {
        JOB_ACTIVE_STATUS => Err(StreamError::JobAlreadyActive),
        200..=299 => Ok(()),
        other => Err(StreamError::UnexpectedStatus(other)),
    }
}

/// Accumulated view of one streamed answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskStreamState {
    /// Answer text shown while streaming
    pub answer: String,
    /// Throughput reported by the final `end` event
    pub tps: Option<f64>,
    /// Set once an `end` event arrived
    pub finished: bool,
}

impl AskStreamState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the state
    pub fn apply(&mut self, chunk: StreamChunk) {
        match chunk {
            StreamChunk::Event(StreamEvent::PartialAssistant { content }) => {
                self.answer = content;
            }
            StreamChunk::Event(StreamEvent::End { tps }) => {
                self.answer.clear();
                self.tps = tps;
                self.finished = true;
            }
            StreamChunk::Event(StreamEvent::Other) => {}
            StreamChunk::Raw(text) => self.answer.push_str(&text),
        }
    }
}
