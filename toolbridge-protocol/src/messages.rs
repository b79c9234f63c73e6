//! Bridge frame types
//!
//! Inbound frames arrive from the agent backend; the only outbound frame the
//! client ever sends is the correlated reply to a `tool_call`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::CodecError;
use crate::types::AgentStatus;

// ==================== Inbound ====================

/// A tool invocation requested by the remote agent
///
/// Only `call_id` is required. A missing or non-string `tool` still decodes,
/// so the call can be answered with a missing-handler error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    #[serde(default, deserialize_with = "lenient_name")]
    pub tool: Option<String>,
    /// Opaque arguments handed to the handler
    #[serde(default)]
    pub args: Value,
    /// Correlation token echoed in the reply
    pub call_id: String,
}

/// Frames received from the backend, discriminated by their `event` tag
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `tool_call`: invoke a client-side tool and reply
    ToolCall(ToolCall),
    /// `memory_update`: replace the held transcript snapshot
    MemoryUpdate { data: Value },
    /// `tools_updated`: the backend tool registry changed
    ToolsUpdated,
    /// `agent_status`: replace the held agent status
    AgentStatus(AgentStatus),
    /// `tool_result`: a result echoed by the backend (the whole frame)
    ToolResult(Value),
    /// Any other tag, or no tag at all
    Unknown { event: Option<String> },
}

fn lenient_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}

#[derive(Deserialize)]
struct DataPayload {
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct StatusPayload {
    data: AgentStatus,
}

impl InboundFrame {
    /// Classify an already-parsed JSON value
    ///
    /// Known tags whose payload does not match the expected shape are
    /// reported as [`CodecError::InvalidPayload`].
    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        let event = value
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let frame = match event.as_deref() {
            Some("tool_call") => Self::ToolCall(payload("tool_call", value)?),
            Some("memory_update") => {
                let DataPayload { data } = payload("memory_update", value)?;
                Self::MemoryUpdate { data }
            }
            Some("tools_updated") => Self::ToolsUpdated,
            Some("agent_status") => {
                let StatusPayload { data } = payload("agent_status", value)?;
                Self::AgentStatus(data)
            }
            Some("tool_result") => Self::ToolResult(value),
            _ => Self::Unknown { event },
        };

        Ok(frame)
    }

    /// Event tag this frame was classified under
    pub fn event_name(&self) -> &str {
        match self {
            Self::ToolCall(_) => "tool_call",
            Self::MemoryUpdate { .. } => "memory_update",
            Self::ToolsUpdated => "tools_updated",
            Self::AgentStatus(_) => "agent_status",
            Self::ToolResult(_) => "tool_result",
            Self::Unknown { event } => event.as_deref().unwrap_or("<none>"),
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    event: &'static str,
    value: Value,
) -> Result<T, CodecError> {
    serde_json::from_value(value).map_err(|source| CodecError::InvalidPayload { event, source })
}

// ==================== Outbound ====================

/// Frames sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Reply to a `tool_call`
    ToolResult { call_id: String, result: Value },
}

impl OutboundFrame {
    /// Build the reply for a tool call
    pub fn tool_result(call_id: impl Into<String>, result: Value) -> Self {
        Self::ToolResult {
            call_id: call_id.into(),
            result,
        }
    }

    /// Correlation token carried by this frame
    pub fn call_id(&self) -> &str {
        match self {
            Self::ToolResult { call_id, .. } => call_id,
        }
    }
}
