//! toolbridge-protocol: Frame definitions for the agent bridge
//!
//! This crate defines the JSON frames exchanged with the agent backend over
//! the `/ws/bridge` WebSocket, plus the line framing used by the
//! `ask_stream` chat endpoint.

pub mod codec;
pub mod messages;
pub mod stream;
pub mod types;

// Re-export main types at crate root
pub use codec::{decode_inbound, encode_outbound, CodecError, MAX_FRAME_SIZE};
pub use messages::{InboundFrame, OutboundFrame, ToolCall};
pub use stream::{
    check_ask_stream_status, AskStreamCodec, AskStreamState, StreamChunk, StreamError,
    StreamEvent, ASK_STREAM_PATH, JOB_ACTIVE_STATUS,
};
pub use types::{
    error_result, AgentState, AgentStatus, UnknownAgentState, NO_HANDLER_MESSAGE,
};

/// Path of the bridge WebSocket endpoint, relative to the page origin
pub const BRIDGE_PATH: &str = "/ws/bridge";
