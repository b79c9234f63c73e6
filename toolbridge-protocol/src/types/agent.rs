use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==================== Agent Status ====================

/// Execution phase reported by the remote agent
///
/// The bridge never validates the tag it receives; this enum only names the
/// phases the backend is known to emit. Use [`AgentStatus::phase`] to map a
/// raw tag onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Waiting for work
    Idle,
    /// Producing assistant output
    Generating,
    /// Waiting on a tool invocation
    ToolCalling,
    /// Task finished normally
    Done,
    /// Task stopped by the operator
    Stopped,
    /// Task failed
    Error,
}

impl AgentState {
    /// Wire tag for this phase
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "idle",
            AgentState::Generating => "generating",
            AgentState::ToolCalling => "tool_calling",
            AgentState::Done => "done",
            AgentState::Stopped => "stopped",
            AgentState::Error => "error",
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a tag is not one of the known agent phases
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent state: {0}")]
pub struct UnknownAgentState(pub String);

impl FromStr for AgentState {
    type Err = UnknownAgentState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentState::Idle),
            "generating" => Ok(AgentState::Generating),
            "tool_calling" => Ok(AgentState::ToolCalling),
            "done" => Ok(AgentState::Done),
            "stopped" => Ok(AgentState::Stopped),
            "error" => Ok(AgentState::Error),
            other => Err(UnknownAgentState(other.to_string())),
        }
    }
}

/// Last-known status of the remote agent
///
/// Replaced wholesale on every `agent_status` frame. The raw `state` tag is
/// kept verbatim and any additional fields the backend sends are preserved
/// in `details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Raw state tag as sent by the backend
    pub state: String,
    /// Any other fields carried alongside the state
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl AgentStatus {
    /// Create a status with the given state tag and no details
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            details: serde_json::Map::new(),
        }
    }

    /// Set a detail field (builder pattern)
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    /// Map the raw tag onto a known phase, if it is one
    pub fn phase(&self) -> Option<AgentState> {
        self.state.parse().ok()
    }

    /// Check whether the raw tag names the given phase
    pub fn is(&self, state: AgentState) -> bool {
        self.state == state.as_str()
    }
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::new(AgentState::Idle.as_str())
    }
}

impl From<AgentState> for AgentStatus {
    fn from(state: AgentState) -> Self {
        Self::new(state.as_str())
    }
}
