//! Observable state sinks fed by the dispatcher
//!
//! Each sink is a `watch` channel: readers get the latest value and can await
//! changes. Every update replaces the previous value wholesale.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use toolbridge_protocol::AgentStatus;

struct Sinks {
    agent_status: watch::Sender<AgentStatus>,
    memory: watch::Sender<Option<Value>>,
    tools_version: watch::Sender<u64>,
    last_tool_result: watch::Sender<Option<Value>>,
}

/// Latest values pushed by the backend
#[derive(Clone)]
pub struct BridgeState {
    sinks: Arc<Sinks>,
}

impl BridgeState {
    pub fn new() -> Self {
        let (agent_status, _) = watch::channel(AgentStatus::default());
        let (memory, _) = watch::channel(None);
        let (tools_version, _) = watch::channel(0);
        let (last_tool_result, _) = watch::channel(None);

        Self {
            sinks: Arc::new(Sinks {
                agent_status,
                memory,
                tools_version,
                last_tool_result,
            }),
        }
    }

    // ==================== Readers ====================

    /// Last agent status (idle until the first `agent_status` frame)
    pub fn agent_status(&self) -> AgentStatus {
        self.sinks.agent_status.borrow().clone()
    }

    /// Last transcript snapshot, if any arrived
    pub fn memory(&self) -> Option<Value> {
        self.sinks.memory.borrow().clone()
    }

    /// Number of `tools_updated` frames seen
    pub fn tools_version(&self) -> u64 {
        *self.sinks.tools_version.borrow()
    }

    pub fn last_tool_result(&self) -> Option<Value> {
        self.sinks.last_tool_result.borrow().clone()
    }

    // ==================== Subscriptions ====================

    pub fn subscribe_agent_status(&self) -> watch::Receiver<AgentStatus> {
        self.sinks.agent_status.subscribe()
    }

    pub fn subscribe_memory(&self) -> watch::Receiver<Option<Value>> {
        self.sinks.memory.subscribe()
    }

    pub fn subscribe_tools_version(&self) -> watch::Receiver<u64> {
        self.sinks.tools_version.subscribe()
    }

    pub fn subscribe_last_tool_result(&self) -> watch::Receiver<Option<Value>> {
        self.sinks.last_tool_result.subscribe()
    }

    // ==================== Updates ====================

    pub(crate) fn set_agent_status(&self, status: AgentStatus) {
        self.sinks.agent_status.send_replace(status);
    }

    pub(crate) fn set_memory(&self, data: Value) {
        self.sinks.memory.send_replace(Some(data));
    }

    /// Bump the tools version, returning the new value
    pub(crate) fn bump_tools_version(&self) -> u64 {
        let mut version = 0;
        self.sinks.tools_version.send_modify(|v| {
            *v += 1;
            version = *v;
        });
        version
    }

    pub(crate) fn set_last_tool_result(&self, frame: Value) {
        self.sinks.last_tool_result.send_replace(Some(frame));
    }
}

impl Default for BridgeState {
    fn default() -> Self {
        Self::new()
    }
}
