//! Script panel state and its `scriptpanel__save_script` tool
//!
//! The agent can push a script into the panel. Saving replaces the code,
//! closes the editor and clears the previous run's result and logs.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::watch;
use toolbridge_utils::Result;

use crate::registry::{Registration, ToolRegistry};

/// Tool name served by the panel
pub const SAVE_SCRIPT_TOOL: &str = "scriptpanel__save_script";

/// Local panel state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptState {
    pub code: String,
    /// Output of the last run
    pub result: String,
    pub logs: String,
    pub editor_open: bool,
}

/// Script panel feature
///
/// Serves [`SAVE_SCRIPT_TOOL`] while mounted.
pub struct ScriptPanel {
    state: Arc<watch::Sender<ScriptState>>,
    registration: Option<Registration>,
}

impl ScriptPanel {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ScriptState::default());
        Self {
            state: Arc::new(state),
            registration: None,
        }
    }

    /// Register the save tool; mounting twice is a no-op
    pub fn mount(&mut self, registry: &ToolRegistry) -> Result<()> {
        if self.is_mounted() {
            return Ok(());
        }

        let state = self.state.clone();
        let registration = registry.register_fn(SAVE_SCRIPT_TOOL, move |args| {
            let code = save_script(&state, &args);
            Ok(json!({"status": "ok", "code": code}))
        })?;

        self.registration = Some(registration);
        Ok(())
    }

    /// Release the save tool; returns whether this panel's handler was removed
    pub fn unmount(&mut self) -> bool {
        self.registration
            .take()
            .is_some_and(Registration::unregister)
    }

    /// Whether this panel currently serves the save tool
    pub fn is_mounted(&self) -> bool {
        self.registration
            .as_ref()
            .is_some_and(Registration::is_current)
    }

    pub fn snapshot(&self) -> ScriptState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScriptState> {
        self.state.subscribe()
    }

    /// Local edit of the code
    pub fn set_code(&self, code: impl Into<String>) {
        let code = code.into();
        self.state.send_modify(|s| s.code = code);
    }

    pub fn set_editor_open(&self, open: bool) {
        self.state.send_modify(|s| s.editor_open = open);
    }

    /// Record the outcome of a run
    pub fn set_run_output(&self, result: impl Into<String>, logs: impl Into<String>) {
        let (result, logs) = (result.into(), logs.into());
        self.state.send_modify(|s| {
            s.result = result;
            s.logs = logs;
        });
    }
}

impl Default for ScriptPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a save request, returning the stored code
fn save_script(state: &watch::Sender<ScriptState>, args: &Value) -> String {
    let code = args
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    tracing::debug!(len = code.len(), "Script saved by agent");
    state.send_modify(|s| {
        s.code = code.clone();
        s.editor_open = false;
        s.result.clear();
        s.logs.clear();
    });
    code
}
