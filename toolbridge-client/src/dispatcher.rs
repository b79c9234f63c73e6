//! Inbound frame dispatcher
//!
//! Classifies every text frame from the bridge and routes it: tool calls to
//! the registry (always answered with exactly one `tool_result`), everything
//! else to the [`BridgeState`] sinks. Malformed frames are dropped.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use toolbridge_protocol::{
    decode_inbound, error_result, InboundFrame, OutboundFrame, ToolCall,
    NO_HANDLER_MESSAGE,
};

use crate::connection::{FrameHandler, FrameSender};
use crate::registry::{HandlerError, ToolHandler, ToolRegistry};
use crate::state::BridgeState;

/// What the dispatcher did with one frame
#[derive(Debug)]
pub enum Dispatched {
    /// Not valid JSON, or a known event with a malformed payload (including
    /// a `tool_call` without a string `call_id`)
    Dropped,
    /// A tool call was accepted; `reply` completes once the result was handed
    /// to the sender
    ToolCall {
        call_id: String,
        matched: bool,
        reply: JoinHandle<()>,
    },
    MemoryUpdated,
    ToolsUpdated { version: u64 },
    AgentStatus,
    ToolResult,
    /// Unknown or missing event tag
    Ignored,
}

/// Routes inbound frames for one session
pub struct Dispatcher {
    registry: ToolRegistry,
    state: BridgeState,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, state: BridgeState) -> Self {
        Self { registry, state }
    }

    /// Handle one inbound text frame
    ///
    /// Never blocks: tool handlers run in their own task. Must be called from
    /// within a Tokio runtime.
    pub fn dispatch(&self, text: &str, sender: &FrameSender) -> Dispatched {
        let frame = match decode_inbound(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Dropping malformed frame: {}", e);
                return Dispatched::Dropped;
            }
        };

        tracing::trace!(event = frame.event_name(), "Dispatching frame");

        match frame {
            InboundFrame::ToolCall(call) => self.dispatch_tool_call(call, sender),
            InboundFrame::MemoryUpdate { data } => {
                self.state.set_memory(data);
                Dispatched::MemoryUpdated
            }
            InboundFrame::ToolsUpdated => Dispatched::ToolsUpdated {
                version: self.state.bump_tools_version(),
            },
            InboundFrame::AgentStatus(status) => {
                tracing::debug!(state = %status.state, "Agent status");
                self.state.set_agent_status(status);
                Dispatched::AgentStatus
            }
            InboundFrame::ToolResult(frame) => {
                self.state.set_last_tool_result(frame);
                Dispatched::ToolResult
            }
            InboundFrame::Unknown { event } => {
                tracing::trace!(?event, "Ignoring frame");
                Dispatched::Ignored
            }
        }
    }

    fn dispatch_tool_call(&self, call: ToolCall, sender: &FrameSender) -> Dispatched {
        let ToolCall {
            tool,
            args,
            call_id,
        } = call;

        tracing::debug!(tool = ?tool, call_id = %call_id, "Tool call");

        // Resolve now; later registry changes don't affect this call
        let handler = tool.and_then(|name| {
            let handler = self.registry.lookup(&name)?;
            Some((name, handler))
        });
        let matched = handler.is_some();

        let sender = sender.clone();
        let reply_id = call_id.clone();
        let reply = tokio::spawn(async move {
            let result = match handler {
                Some((name, handler)) => invoke(&name, handler, args).await,
                None => error_result(NO_HANDLER_MESSAGE),
            };
            send_reply(&sender, OutboundFrame::tool_result(reply_id, result)).await;
        });

        Dispatched::ToolCall {
            call_id,
            matched,
            reply,
        }
    }
}

impl FrameHandler for Dispatcher {
    fn handle_text(&self, text: &str, sender: &FrameSender) {
        let _ = self.dispatch(text, sender);
    }

    fn on_connected(&self) {
        tracing::debug!(tools = ?self.registry.names(), "Bridge open");
    }

    fn on_disconnected(&self) {
        tracing::debug!("Bridge closed; pending replies will be dropped");
    }
}

/// Run a handler, turning errors and panics into error results
async fn invoke(tool: &str, handler: ToolHandler, args: Value) -> Value {
    let outcome = AssertUnwindSafe(async move { handler(args).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            tracing::warn!(tool, "Tool handler failed: {}", e);
            error_result(e.to_string())
        }
        Err(panic) => {
            let e = HandlerError::Panicked(panic_message(panic.as_ref()));
            tracing::error!(tool, "{}", e);
            error_result(e.to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn send_reply(sender: &FrameSender, frame: OutboundFrame) {
    let call_id = frame.call_id().to_owned();
    match sender.send(frame).await {
        Ok(()) => tracing::trace!(call_id = %call_id, "Tool result queued"),
        Err(e) => tracing::warn!(call_id = %call_id, "Dropping tool result: {}", e),
    }
}
