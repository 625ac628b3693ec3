//! WebSocket transport session.
//!
//! A [`Session`] owns at most one live WebSocket connection to a tool host.
//! It never parses frames: every inbound text frame is handed to each
//! subscriber as a [`SessionEvent::Message`], in arrival order. Every
//! connection gets a fresh generation number so that events of a closed
//! connection can never be confused with those of the next one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::error::{McpError, Result};

/// Default bound on the connection handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Connected and ready.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting..."),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// [`Session::disconnect`] was called.
    Requested,
    /// The host closed the socket.
    ClosedByHost,
    /// The transport failed.
    Error(String),
}

/// Notification published to session subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A connection opened.
    Connected {
        /// Generation of the new connection.
        generation: u64,
    },
    /// A text frame arrived.
    Message {
        /// Generation of the connection it arrived on.
        generation: u64,
        /// Raw frame body.
        text: String,
    },
    /// A connection ended.
    Disconnected {
        /// Generation of the connection that ended.
        generation: u64,
        /// Why it ended.
        reason: DisconnectReason,
    },
}

/// Configuration for a transport session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint (`ws://`, `wss://`; `http(s)://` is rewritten).
    pub endpoint: String,
    /// Bound on the connection handshake.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Create a config for the given endpoint with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Parse an endpoint into a WebSocket URL.
///
/// `http` and `https` are mapped to `ws` and `wss`; the path is kept.
pub fn normalize_endpoint(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| McpError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

    let scheme = match url.scheme() {
        "ws" | "http" => "ws",
        "wss" | "https" => "wss",
        other => {
            return Err(McpError::InvalidEndpoint(format!(
                "unsupported scheme '{}'",
                other
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| McpError::InvalidEndpoint(format!("cannot use scheme '{}'", scheme)))?;

    Ok(url)
}

/// The live half of a connection.
struct Link {
    generation: u64,
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
}

struct SessionInner {
    url: Url,
    connect_timeout: Duration,
    link: Mutex<Option<Link>>,
    generation: AtomicU64,
    state_tx: watch::Sender<ConnectionState>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>,
    /// Serializes connection attempts.
    connect_gate: tokio::sync::Mutex<()>,
}

impl SessionInner {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn publish(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Tear down the link of `generation` if it is still the live one.
    fn drop_link(&self, generation: u64, reason: DisconnectReason) -> bool {
        let link = {
            let mut guard = self.link.lock();
            match guard.as_ref() {
                Some(link) if link.generation == generation => guard.take(),
                _ => None,
            }
        };
        let Some(link) = link else {
            return false;
        };

        if reason == DisconnectReason::Requested {
            let _ = link.outbound.send(Message::Close(None));
            link.reader.abort();
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::info!(
            endpoint = %self.url,
            generation,
            reason = ?reason,
            "tool host connection closed"
        );
        self.publish(SessionEvent::Disconnected { generation, reason });
        true
    }
}

/// Returns the session to `Disconnected` if a connect attempt ends early,
/// whether by error, timeout or the caller dropping the future.
struct ConnectingGuard<'a> {
    inner: &'a SessionInner,
    armed: bool,
}

impl<'a> ConnectingGuard<'a> {
    fn new(inner: &'a SessionInner) -> Self {
        Self { inner, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.set_state(ConnectionState::Disconnected);
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            let _ = link.outbound.send(Message::Close(None));
            link.reader.abort();
        }
    }
}

/// One logical connection to a tool host.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.inner.url.as_str())
            .field("state", &self.state())
            .finish()
    }
}

impl Session {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let url = normalize_endpoint(&config.endpoint)?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            inner: Arc::new(SessionInner {
                url,
                connect_timeout: config.connect_timeout,
                link: Mutex::new(None),
                generation: AtomicU64::new(0),
                state_tx,
                subscribers: Mutex::new(Vec::new()),
                connect_gate: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// The normalized endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.inner.url
    }

    /// The configured connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.inner.connect_timeout
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_tx.borrow()
    }

    /// Whether a connection is open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Generation of the live connection, if any.
    pub fn generation(&self) -> Option<u64> {
        self.inner.link.lock().as_ref().map(|link| link.generation)
    }

    /// Subscribe to session events from now on.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().push(tx);
        rx
    }

    /// Open the connection.
    ///
    /// No-op when already connected. Concurrent callers share one attempt.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let _gate = self.inner.connect_gate.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        let inner = &self.inner;
        inner.set_state(ConnectionState::Connecting);
        let attempt_guard = ConnectingGuard::new(inner);
        tracing::debug!(endpoint = %inner.url, "connecting to tool host");

        let attempt = tokio::time::timeout(inner.connect_timeout, connect_async(inner.url.as_str()));
        let stream = match attempt.await {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => {
                tracing::warn!(endpoint = %inner.url, error = %e, "tool host connection failed");
                return Err(McpError::connect(e.to_string()));
            }
            Err(_) => {
                tracing::warn!(
                    endpoint = %inner.url,
                    timeout_ms = inner.connect_timeout.as_millis() as u64,
                    "tool host connection timed out"
                );
                return Err(McpError::ConnectTimeout(inner.connect_timeout));
            }
        };

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (sink, stream) = stream.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        tokio::spawn(write_loop(sink, outbound_rx));
        let reader = tokio::spawn(read_loop(
            Arc::downgrade(inner),
            generation,
            stream,
            outbound_tx.clone(),
            ready_rx,
        ));

        *inner.link.lock() = Some(Link {
            generation,
            outbound: outbound_tx,
            reader,
        });
        inner.set_state(ConnectionState::Connected);
        attempt_guard.disarm();
        inner.publish(SessionEvent::Connected { generation });
        tracing::info!(endpoint = %inner.url, generation, "connected to tool host");

        // Frames are only forwarded once the link is installed.
        let _ = ready_tx.send(());
        Ok(())
    }

    /// Close the connection if open.
    ///
    /// State is cleared immediately; the close handshake is not awaited.
    pub fn disconnect(&self) {
        let generation = self.generation();
        if let Some(generation) = generation {
            self.inner
                .drop_link(generation, DisconnectReason::Requested);
        }
    }

    /// Send a text frame on the connection of `generation`.
    ///
    /// Fails with `ConnectionLost` if that connection is gone, even when a
    /// newer one is open.
    pub fn send_on(&self, generation: u64, text: String) -> Result<()> {
        let guard = self.inner.link.lock();
        let link = guard.as_ref().ok_or(McpError::ConnectionLost)?;
        if link.generation != generation {
            return Err(McpError::ConnectionLost);
        }
        tracing::trace!(generation, json = %text, "sending frame");
        link.outbound
            .send(Message::Text(text.into()))
            .map_err(|_| McpError::ConnectionLost)
    }

    /// Send a text frame on the live connection.
    pub fn send(&self, text: String) -> Result<u64> {
        let generation = self.generation().ok_or(McpError::NotConnected)?;
        self.send_on(generation, text)?;
        Ok(generation)
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = outbound.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            tracing::debug!(error = %e, "websocket write failed");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    session: Weak<SessionInner>,
    generation: u64,
    mut stream: SplitStream<WsStream>,
    outbound: mpsc::UnboundedSender<Message>,
    ready: oneshot::Receiver<()>,
) {
    if ready.await.is_err() {
        return;
    }

    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let Some(inner) = session.upgrade() else {
                    return;
                };
                tracing::trace!(generation, json = %text.as_str(), "received frame");
                inner.publish(SessionEvent::Message {
                    generation,
                    text: text.as_str().to_owned(),
                });
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = outbound.send(Message::Pong(data));
            }
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
            Some(Ok(Message::Binary(_))) => {
                tracing::warn!(generation, "ignoring binary frame from tool host");
            }
            Some(Ok(Message::Close(_))) | None => break DisconnectReason::ClosedByHost,
            Some(Err(e)) => break DisconnectReason::Error(e.to_string()),
        }
    };

    if let Some(inner) = session.upgrade() {
        inner.drop_link(generation, reason);
    }
}
