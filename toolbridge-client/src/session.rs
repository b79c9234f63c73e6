//! Bridge session: one connection plus the registry and state it feeds
//!
//! The registry and state belong to the session, not to the connection, so
//! registrations survive reconnects and manual reconnects alike.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use toolbridge_utils::Result;
use url::Url;

use crate::config::BridgeConfig;
use crate::connection::{bridge_endpoint, Connection, ConnectionState, FrameHandler};
use crate::dispatcher::Dispatcher;
use crate::registry::ToolRegistry;
use crate::state::BridgeState;

pub struct BridgeSession {
    config: BridgeConfig,
    registry: ToolRegistry,
    state: BridgeState,
    dispatcher: Arc<Dispatcher>,
    connection: Connection,
}

impl BridgeSession {
    /// Build a session from validated configuration (does not connect)
    pub fn new(config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let endpoint = bridge_endpoint(&config.origin)?;

        let registry = ToolRegistry::new();
        let state = BridgeState::new();
        let dispatcher = Arc::new(Dispatcher::new(registry.clone(), state.clone()));
        let connection = Connection::new(endpoint)
            .with_buffer(config.outgoing_buffer)
            .with_reconnect(config.reconnect.clone());

        Ok(Self {
            config,
            registry,
            state,
            dispatcher,
            connection,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Registry features register their tools into
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn endpoint(&self) -> &Url {
        self.connection.endpoint()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe_state()
    }

    /// Cancelled once the current connection task has exited for good
    pub fn finished(&self) -> CancellationToken {
        self.connection.finished()
    }

    pub async fn connect(&mut self) -> Result<()> {
        let handler: Arc<dyn FrameHandler> = self.dispatcher.clone();
        self.connection.connect(handler).await
    }

    pub async fn teardown(&mut self) {
        self.connection.teardown().await;
    }
}
