//! WebSocket connection to the agent bridge

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

use toolbridge_protocol::{encode_outbound, error_result, OutboundFrame};
use toolbridge_utils::{BridgeError, Result};

use crate::config::ReconnectConfig;

use super::handler::{FrameHandler, FrameSender};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default capacity of the outgoing frame queue
const DEFAULT_BUFFER: usize = 100;

/// How long teardown waits for the close handshake before aborting the task
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client connection to the bridge endpoint
///
/// Owns at most one live socket. The outgoing queue outlives individual
/// sockets when reconnect is enabled.
pub struct Connection {
    /// Bridge WebSocket URL
    endpoint: Url,
    /// Reconnect policy applied after an established socket drops
    reconnect: ReconnectConfig,
    /// Outgoing queue capacity
    buffer: usize,
    /// Current state, shared with the connection task and every sender
    state_tx: Arc<watch::Sender<ConnectionState>>,
    /// Channel for outgoing frames
    tx: mpsc::Sender<OutboundFrame>,
    /// Receiving half, handed to the connection task on connect
    rx: Option<mpsc::Receiver<OutboundFrame>>,
    /// Stops the connection task
    shutdown: CancellationToken,
    /// Cancelled by the connection task when it exits
    finished: CancellationToken,
    /// Handle to the connection task
    task_handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Create a new connection (not yet connected)
    pub fn new(endpoint: Url) -> Self {
        let (tx, rx) = mpsc::channel(DEFAULT_BUFFER);
        let (state_tx, _) = watch::channel(ConnectionState::Closed);

        Self {
            endpoint,
            reconnect: ReconnectConfig::default(),
            buffer: DEFAULT_BUFFER,
            state_tx: Arc::new(state_tx),
            tx,
            rx: Some(rx),
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Set the reconnect policy (builder pattern)
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Set the outgoing queue capacity (builder pattern)
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.tx = tx;
        self.rx = Some(rx);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Get a frame sender that can be cloned
    pub fn sender(&self) -> FrameSender {
        FrameSender::new(self.tx.clone(), self.state_tx.subscribe())
    }

    /// Token cancelled once the connection task has exited for good
    ///
    /// Replaced on every successful [`connect`](Self::connect).
    pub fn finished(&self) -> CancellationToken {
        self.finished.clone()
    }

    /// Whether a connection task is running (open, or reconnecting)
    pub fn is_active(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Connect to the bridge and start delivering frames to `handler`
    ///
    /// Performs the handshake before returning. Calling this while a
    /// connection task is still running is a no-op.
    pub async fn connect(&mut self, handler: Arc<dyn FrameHandler>) -> Result<()> {
        if self.is_active() {
            return Ok(());
        }
        self.task_handle = None;

        self.state_tx.send_replace(ConnectionState::Connecting);
        tracing::debug!(endpoint = %self.endpoint, "Connecting to bridge");

        let stream = match open_stream(&self.endpoint).await {
            Ok(stream) => stream,
            Err(e) => {
                self.state_tx.send_replace(ConnectionState::Closed);
                return Err(e);
            }
        };

        // The previous task consumed the receiver; start a fresh queue
        let outgoing = match self.rx.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel(self.buffer);
                self.tx = tx;
                rx
            }
        };

        self.shutdown = CancellationToken::new();
        self.finished = CancellationToken::new();

        let task = ConnectionTask {
            endpoint: self.endpoint.clone(),
            reconnect: self.reconnect.clone(),
            outgoing,
            sender: self.sender(),
            handler,
            state: self.state_tx.clone(),
            shutdown: self.shutdown.clone(),
        };

        self.state_tx.send_replace(ConnectionState::Open);
        task.handler.on_connected();
        tracing::info!(endpoint = %self.endpoint, "Bridge connected");

        let finished = self.finished.clone();
        let handle = tokio::spawn(async move {
            let _guard = finished.drop_guard();
            task.run(stream).await;
        });
        self.task_handle = Some(handle);

        Ok(())
    }

    /// Queue a frame for sending
    pub async fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.sender().send(frame).await
    }

    /// Close the connection and wait for the connection task to finish
    pub async fn teardown(&mut self) {
        self.shutdown.cancel();

        if let Some(mut handle) = self.task_handle.take() {
            if tokio::time::timeout(TEARDOWN_TIMEOUT, &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("Connection task did not stop in time, aborting");
                handle.abort();
            }
        }

        self.state_tx.send_replace(ConnectionState::Closed);
        tracing::info!(endpoint = %self.endpoint, "Bridge torn down");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The task notices the cancellation and closes the socket itself
        self.shutdown.cancel();
    }
}

#[cfg(not(feature = "tls"))]
fn check_scheme(endpoint: &Url) -> Result<()> {
    if super::endpoint::is_secure(endpoint) {
        return Err(BridgeError::invalid_endpoint(
            endpoint.as_str(),
            "requires TLS support (build with the `tls` feature)",
        ));
    }
    Ok(())
}

#[cfg(feature = "tls")]
fn check_scheme(_endpoint: &Url) -> Result<()> {
    Ok(())
}

async fn open_stream(endpoint: &Url) -> Result<WsStream> {
    check_scheme(endpoint)?;

    let (stream, response) = tokio_tungstenite::connect_async(endpoint.as_str())
        .await
        .map_err(|e| BridgeError::connection(format!("Failed to connect to {}: {}", endpoint, e)))?;

    tracing::debug!(status = %response.status(), "Bridge handshake complete");
    Ok(stream)
}

/// Why the pump loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    /// Teardown requested
    Shutdown,
    /// Socket closed or failed
    Dropped,
}

/// Background task that handles the actual socket I/O
struct ConnectionTask {
    endpoint: Url,
    reconnect: ReconnectConfig,
    outgoing: mpsc::Receiver<OutboundFrame>,
    sender: FrameSender,
    handler: Arc<dyn FrameHandler>,
    state: Arc<watch::Sender<ConnectionState>>,
    shutdown: CancellationToken,
}

impl ConnectionTask {
    async fn run(mut self, mut stream: WsStream) {
        loop {
            let exit = self.pump(stream).await;
            self.state.send_replace(ConnectionState::Closed);
            self.handler.on_disconnected();

            if exit == PumpExit::Shutdown || !self.reconnect.enabled {
                break;
            }

            match self.reestablish().await {
                Some(next) => {
                    self.discard_stale_frames();
                    self.state.send_replace(ConnectionState::Open);
                    self.handler.on_connected();
                    tracing::info!(endpoint = %self.endpoint, "Bridge reconnected");
                    stream = next;
                }
                None => {
                    self.state.send_replace(ConnectionState::Closed);
                    break;
                }
            }
        }

        tracing::debug!("Connection task exiting");
    }

    async fn pump(&mut self, mut stream: WsStream) -> PumpExit {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if let Err(e) = stream.close(None).await {
                        tracing::debug!("Close handshake failed: {}", e);
                    }
                    return PumpExit::Shutdown;
                }

                // Handle outgoing frames
                Some(frame) = self.outgoing.recv() => {
                    let Some(text) = encode_reply(&frame) else {
                        continue;
                    };
                    if let Err(e) = stream.send(Message::Text(text.into())).await {
                        tracing::error!(call_id = frame.call_id(), "Failed to send frame: {}", e);
                        return PumpExit::Dropped;
                    }
                }

                // Handle incoming frames
                result = stream.next() => {
                    match result {
                        Some(Ok(Message::Text(text))) => {
                            self.handler.handle_text(text.as_str(), &self.sender);
                        }
                        Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                            Ok(text) => self.handler.handle_text(text, &self.sender),
                            Err(_) => tracing::debug!(len = data.len(), "Dropping non-UTF-8 binary frame"),
                        },
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Server closed bridge");
                            return PumpExit::Dropped;
                        }
                        // Ping/pong are answered by tungstenite
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("Failed to receive frame: {}", e);
                            return PumpExit::Dropped;
                        }
                        None => {
                            tracing::info!("Bridge stream ended");
                            return PumpExit::Dropped;
                        }
                    }
                }
            }
        }
    }

    /// Retry the handshake with exponential backoff
    async fn reestablish(&mut self) -> Option<WsStream> {
        let mut attempt = 0u32;

        loop {
            if !self.reconnect.allows_attempt(attempt) {
                tracing::warn!(attempts = attempt, "Giving up on reconnecting");
                return None;
            }

            let delay = self.reconnect.delay_for(attempt);
            self.state.send_replace(ConnectionState::Connecting);
            tracing::info!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "Reconnecting");

            let result = tokio::select! {
                _ = self.shutdown.cancelled() => return None,
                result = async {
                    tokio::time::sleep(delay).await;
                    open_stream(&self.endpoint).await
                } => result,
            };

            match result {
                Ok(stream) => return Some(stream),
                Err(e) if !e.is_retryable() => {
                    tracing::error!("Not retrying bridge connection: {}", e);
                    return None;
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, "Reconnect failed: {}", e);
                    attempt += 1;
                }
            }
        }
    }

    /// Drop replies queued for the previous socket
    fn discard_stale_frames(&mut self) {
        let mut dropped = 0usize;
        while self.outgoing.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded frames queued before reconnect");
        }
    }
}

/// Encode a queued frame, answering an unencodable result with an error
fn encode_reply(frame: &OutboundFrame) -> Option<String> {
    let err = match encode_outbound(frame) {
        Ok(text) => return Some(text),
        Err(e) => e,
    };
    tracing::warn!(call_id = frame.call_id(), "Tool result not encodable: {}", err);

    let fallback = OutboundFrame::tool_result(
        frame.call_id(),
        error_result(format!("result could not be encoded: {}", err)),
    );
    match encode_outbound(&fallback) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(call_id = frame.call_id(), "Failed to encode frame: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use toolbridge_protocol::MAX_FRAME_SIZE;

    type ServerStream = WebSocketStream<TcpStream>;

    /// Accept WebSocket clients on an ephemeral port, handing each to the test
    async fn spawn_server() -> (Url, mpsc::UnboundedReceiver<ServerStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                if let Ok(ws) = tokio_tungstenite::accept_async(tcp).await {
                    if tx.send(ws).is_err() {
                        break;
                    }
                }
            }
        });

        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/bridge", port)).unwrap();
        (url, rx)
    }

    /// Forwards every text frame to the test
    struct Collecting(mpsc::UnboundedSender<String>);

    impl FrameHandler for Collecting {
        fn handle_text(&self, text: &str, _sender: &FrameSender) {
            let _ = self.0.send(text.to_string());
        }
    }

    fn collecting_handler() -> (Arc<dyn FrameHandler>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Collecting(tx)), rx)
    }

    async fn wait_for_state(conn: &Connection, wanted: ConnectionState) {
        let mut rx = conn.subscribe_state();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == wanted))
            .await
            .expect("timed out waiting for state")
            .unwrap();
    }

    async fn next_text(server: &mut ServerStream) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), server.next())
                .await
                .expect("timed out waiting for frame")
                .unwrap()
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[tokio::test]
    async fn test_connection_state_initial() {
        let conn = Connection::new(Url::parse("ws://127.0.0.1:1/ws/bridge").unwrap());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.is_active());
    }

    #[tokio::test]
    async fn test_connect_no_server() {
        // Grab a free port, then release it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/bridge", port)).unwrap();
        let mut conn = Connection::new(url);
        let (handler, _rx) = collecting_handler();

        let err = conn.connect(handler).await.unwrap_err();
        assert!(matches!(err, BridgeError::Connection(_)));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[cfg(not(feature = "tls"))]
    #[tokio::test]
    async fn test_connect_wss_without_tls() {
        let mut conn = Connection::new(Url::parse("wss://example.com/ws/bridge").unwrap());
        let (handler, _rx) = collecting_handler();

        let err = conn.connect(handler).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidEndpoint { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("tls"));
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_send_not_connected() {
        let conn = Connection::new(Url::parse("ws://127.0.0.1:1/ws/bridge").unwrap());
        let result = conn
            .send(OutboundFrame::tool_result("c1", json!(null)))
            .await;
        assert!(matches!(result, Err(BridgeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_and_receive() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, mut received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
        assert!(conn.is_active());

        let mut server = accepted.recv().await.unwrap();
        server
            .send(Message::Text(r#"{"event":"tools_updated"}"#.into()))
            .await
            .unwrap();

        let text = tokio::time::timeout(Duration::from_secs(5), received.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, r#"{"event":"tools_updated"}"#);

        conn.teardown().await;
    }

    #[tokio::test]
    async fn test_connect_already_connected() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, _received) = collecting_handler();

        conn.connect(handler.clone()).await.unwrap();
        let _server = accepted.recv().await.unwrap();

        // Connect again should be a no-op
        conn.connect(handler).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);
        let second = tokio::time::timeout(Duration::from_millis(200), accepted.recv()).await;
        assert!(second.is_err(), "no second socket expected");

        conn.teardown().await;
    }

    #[tokio::test]
    async fn test_binary_utf8_delivered() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, mut received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let mut server = accepted.recv().await.unwrap();

        server
            .send(Message::Binary(vec![0xff, 0xfe].into()))
            .await
            .unwrap();
        server
            .send(Message::Binary(b"{\"event\":\"x\"}".to_vec().into()))
            .await
            .unwrap();

        let text = tokio::time::timeout(Duration::from_secs(5), received.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, "{\"event\":\"x\"}");

        conn.teardown().await;
    }

    #[tokio::test]
    async fn test_send_reaches_server() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url).with_buffer(4);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let mut server = accepted.recv().await.unwrap();

        conn.send(OutboundFrame::tool_result("abc-1", json!({"status": "ok"})))
            .await
            .unwrap();

        assert_eq!(
            next_text(&mut server).await,
            json!({"event": "tool_result", "call_id": "abc-1", "result": {"status": "ok"}})
        );

        conn.teardown().await;
    }

    #[test]
    fn test_encode_reply_oversized_result() {
        let frame = OutboundFrame::tool_result("big", json!("x".repeat(MAX_FRAME_SIZE)));
        let text = encode_reply(&frame).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["event"], "tool_result");
        assert_eq!(value["call_id"], "big");
        assert_eq!(value["result"]["status"], "error");
        assert!(value["result"]["message"]
            .as_str()
            .unwrap()
            .starts_with("result could not be encoded"));
    }

    #[tokio::test]
    async fn test_oversized_result_still_answered() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let mut server = accepted.recv().await.unwrap();

        conn.send(OutboundFrame::tool_result("big", json!("x".repeat(MAX_FRAME_SIZE))))
            .await
            .unwrap();

        let reply = next_text(&mut server).await;
        assert_eq!(reply["call_id"], "big");
        assert_eq!(reply["result"]["status"], "error");

        conn.teardown().await;
    }

    #[tokio::test]
    async fn test_drop_closes_socket() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let finished = conn.finished();
        let mut server = accepted.recv().await.unwrap();

        drop(conn);

        tokio::time::timeout(Duration::from_secs(5), finished.cancelled())
            .await
            .expect("connection task kept running after drop");
        let msg = tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .unwrap();
        assert!(matches!(msg, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
    }

    #[tokio::test]
    async fn test_server_close_sets_closed() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let mut server = accepted.recv().await.unwrap();
        server.close(None).await.unwrap();

        wait_for_state(&conn, ConnectionState::Closed).await;
        tokio::time::timeout(Duration::from_secs(5), conn.finished().cancelled())
            .await
            .unwrap();
        assert!(!conn.is_active());

        // Sends after close fail instead of queueing
        let sender = conn.sender();
        assert!(sender
            .send(OutboundFrame::tool_result("late", json!(1)))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_teardown_closes_socket() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let mut server = accepted.recv().await.unwrap();

        conn.teardown().await;
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.is_active());

        // Server sees the close frame (or end of stream)
        let msg = tokio::time::timeout(Duration::from_secs(5), server.next())
            .await
            .unwrap();
        assert!(matches!(msg, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
    }

    #[tokio::test]
    async fn test_connect_after_close() {
        let (url, mut accepted) = spawn_server().await;
        let mut conn = Connection::new(url);
        let (handler, _received) = collecting_handler();

        conn.connect(handler.clone()).await.unwrap();
        let _first = accepted.recv().await.unwrap();
        conn.teardown().await;

        conn.connect(handler).await.unwrap();
        let mut second = accepted.recv().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Open);

        conn.send(OutboundFrame::tool_result("again", json!(2)))
            .await
            .unwrap();
        assert_eq!(next_text(&mut second).await["call_id"], "again");

        conn.teardown().await;
    }

    #[tokio::test]
    async fn test_reconnect_after_drop() {
        let (url, mut accepted) = spawn_server().await;
        let reconnect = ReconnectConfig {
            enabled: true,
            initial_delay_ms: 10,
            max_delay_ms: 50,
            max_attempts: Some(20),
        };
        let mut conn = Connection::new(url).with_reconnect(reconnect);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        let sender = conn.sender();

        let first = accepted.recv().await.unwrap();
        drop(first);

        let mut second = tokio::time::timeout(Duration::from_secs(5), accepted.recv())
            .await
            .unwrap()
            .unwrap();
        wait_for_state(&conn, ConnectionState::Open).await;
        assert!(conn.is_active());

        // A sender taken before the drop still works
        sender
            .send(OutboundFrame::tool_result("after-reconnect", json!(true)))
            .await
            .unwrap();
        assert_eq!(next_text(&mut second).await["call_id"], "after-reconnect");

        conn.teardown().await;
    }

    #[tokio::test]
    async fn test_reconnect_gives_up() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Serve exactly one client, then stop listening
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            drop(listener);
            drop(ws);
        });

        let url = Url::parse(&format!("ws://127.0.0.1:{}/ws/bridge", port)).unwrap();
        let reconnect = ReconnectConfig {
            enabled: true,
            initial_delay_ms: 5,
            max_delay_ms: 10,
            max_attempts: Some(2),
        };
        let mut conn = Connection::new(url).with_reconnect(reconnect);
        let (handler, _received) = collecting_handler();

        conn.connect(handler).await.unwrap();
        server.await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), conn.finished().cancelled())
            .await
            .unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }
}
