//! toolbridge-client: answers tool calls from a remote agent
//!
//! Holds one WebSocket connection to the console backend's `/ws/bridge`
//! endpoint. Inbound `tool_call` frames are routed to handlers registered in a
//! [`ToolRegistry`] and always answered with exactly one `tool_result`; status
//! and transcript frames update the [`BridgeState`] sinks.

pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod registry;
pub mod script_panel;
pub mod session;
pub mod state;

pub use config::{load_config, load_config_from, BridgeConfig, ReconnectConfig};
pub use connection::{bridge_endpoint, Connection, ConnectionState, FrameHandler, FrameSender};
pub use dispatcher::{Dispatched, Dispatcher};
pub use registry::{HandlerError, Registration, ToolHandler, ToolRegistry, ToolResult};
pub use script_panel::{ScriptPanel, ScriptState, SAVE_SCRIPT_TOOL};
pub use session::BridgeSession;
pub use state::BridgeState;
