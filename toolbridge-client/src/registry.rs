//! Tool handler registry
//!
//! Maps tool names to async handlers. Features register independently of the
//! connection lifecycle and get back a [`Registration`] that removes the entry
//! when dropped, but only if nobody re-registered the name in the meantime.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use toolbridge_utils::{BridgeError, Result};

/// Failure reported by a tool handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}

/// Outcome of one tool invocation
pub type ToolResult = std::result::Result<Value, HandlerError>;

/// Async tool handler: arguments in, result out
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, ToolResult> + Send + Sync>;

struct Entry {
    id: u64,
    handler: ToolHandler,
}

#[derive(Default)]
struct RegistryInner {
    entries: DashMap<String, Entry>,
    next_id: AtomicU64,
}

/// Shared tool name -> handler table
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    inner: Arc<RegistryInner>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any existing one
    pub fn register(&self, name: impl Into<String>, handler: ToolHandler) -> Result<Registration> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BridgeError::InvalidToolName(name));
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .inner
            .entries
            .insert(name.clone(), Entry { id, handler })
            .is_some();

        if replaced {
            tracing::debug!(tool = %name, "Replaced tool handler");
        } else {
            tracing::debug!(tool = %name, "Registered tool handler");
        }

        Ok(Registration {
            name,
            id,
            registry: Arc::downgrade(&self.inner),
            active: true,
        })
    }

    /// Register a synchronous handler
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F) -> Result<Registration>
    where
        F: Fn(Value) -> ToolResult + Send + Sync + 'static,
    {
        let handler: ToolHandler = Arc::new(move |args| futures::future::ready(f(args)).boxed());
        self.register(name, handler)
    }

    /// Register an async handler
    pub fn register_async<F, Fut>(&self, name: impl Into<String>, f: F) -> Result<Registration>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(move |args| f(args).boxed());
        self.register(name, handler)
    }

    /// Snapshot the handler currently registered under `name`
    pub fn lookup(&self, name: &str) -> Option<ToolHandler> {
        self.inner
            .entries
            .get(name)
            .map(|entry| entry.handler.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.entries.contains_key(name)
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

/// Disposer for one registration
///
/// Dropping it unregisters the handler if the entry is still the one it
/// created.
#[must_use = "dropping a Registration unregisters the handler"]
pub struct Registration {
    name: String,
    id: u64,
    registry: Weak<RegistryInner>,
    active: bool,
}

impl Registration {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the registry still maps the name to this registration's handler
    pub fn is_current(&self) -> bool {
        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let current = inner
            .entries
            .get(&self.name)
            .is_some_and(|entry| entry.id == self.id);
        current
    }

    /// Remove the handler now; returns whether an entry was removed
    pub fn unregister(mut self) -> bool {
        self.release()
    }

    /// Keep the handler registered for the registry's lifetime
    pub fn detach(mut self) {
        self.active = false;
    }

    fn release(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;

        let Some(inner) = self.registry.upgrade() else {
            return false;
        };
        let removed = inner
            .entries
            .remove_if(&self.name, |_, entry| entry.id == self.id)
            .is_some();

        if removed {
            tracing::debug!(tool = %self.name, "Unregistered tool handler");
        } else {
            tracing::trace!(tool = %self.name, "Stale registration, handler left in place");
        }
        removed
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
