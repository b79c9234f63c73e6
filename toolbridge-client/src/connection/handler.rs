//! Frame handler trait and outgoing sender

use tokio::sync::{mpsc, watch};
use toolbridge_protocol::OutboundFrame;
use toolbridge_utils::{BridgeError, Result};

use super::client::ConnectionState;

/// Clonable handle for queueing outbound frames
///
/// Sends are refused unless the connection is currently open.
#[derive(Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<OutboundFrame>,
    state: watch::Receiver<ConnectionState>,
}

impl FrameSender {
    pub fn new(tx: mpsc::Sender<OutboundFrame>, state: watch::Receiver<ConnectionState>) -> Self {
        Self { tx, state }
    }

    /// Whether the connection is open right now
    pub fn is_open(&self) -> bool {
        *self.state.borrow() == ConnectionState::Open
    }

    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        if !self.is_open() {
            return Err(BridgeError::NotConnected);
        }

        self.tx
            .send(frame)
            .await
            .map_err(|_| BridgeError::ConnectionClosed)?;
        Ok(())
    }
}

/// Trait for handling incoming bridge text frames
///
/// Called from the connection task in arrival order. Implementations must not
/// block; long-running work belongs in a spawned task.
pub trait FrameHandler: Send + Sync + 'static {
    /// Handle one text frame
    fn handle_text(&self, text: &str, sender: &FrameSender);

    /// Called when the connection is established
    fn on_connected(&self) {}

    /// Called when the connection is lost
    fn on_disconnected(&self) {}
}
