use serde_json::{json, Value};

/// Message carried by the error result sent when no handler is registered
pub const NO_HANDLER_MESSAGE: &str = "no handler registered";

/// Build an error-shaped tool result: `{"status": "error", "message": ...}`
pub fn error_result(message: impl Into<String>) -> Value {
    json!({
        "status": "error",
        "message": message.into(),
    })
}
