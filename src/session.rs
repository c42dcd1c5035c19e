//! Session lifecycle and the connection drain loop.
//!
//! [`RealtimeSession`] owns one connection at a time. A single spawned
//! task holds both halves of the transport and multiplexes outbound
//! sends with inbound frames, so wire order is preserved in both
//! directions: events are delivered in arrival order through
//! [`RealtimeSession::event_stream`] and to registered callbacks.
//!
//! Connection states: `Disconnected -> Connecting -> Connected`,
//! terminating in `Disconnected` (caller-initiated) or `Failed`
//! (transport loss). The engine never reconnects on its own; a caller
//! that observes `Failed` may call `connect()` again, which moves the
//! session back through `Connecting`.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::assembly::ResponseAssembler;
use crate::config::{DEFAULT_REALTIME_URL, SessionConfig};
use crate::conversation::{ConversationItem, RemoteSession};
use crate::error::{RealtimeError, RealtimeResult};
use crate::events::{ClientEvent, EventKind, ResponseOverrides, ServerEvent};
use crate::transport::{
    ConnectOptions, TransportConnector, TransportSink, TransportStream, WebSocketConnector,
};

/// Channel capacity for outbound frames.
const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Connected and draining events
    Connected,
    /// Part of the state vocabulary for layers that orchestrate their
    /// own retry loop; the engine itself moves `Failed` back through
    /// `Connecting`
    Reconnecting,
    /// Connection lost; connect() may be called again
    Failed,
}

/// Async callback invoked with a received event.
pub type EventCallback =
    Arc<dyn Fn(ServerEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Ordered stream of received events. Protocol violations appear as
/// `Err` items in place, without ending the stream; a transport failure
/// yields a final `Err` and then the stream ends.
pub type EventStream = mpsc::UnboundedReceiver<RealtimeResult<ServerEvent>>;

struct OutboundFrame {
    frame: String,
    ack: oneshot::Sender<RealtimeResult<()>>,
}

type HandlerMap = HashMap<EventKind, Vec<EventCallback>>;

/// A client session against a realtime endpoint.
///
/// All methods take `&self`; the session is internally synchronized and
/// can be shared behind an `Arc`.
pub struct RealtimeSession {
    /// Caller intent; replaced only after the server acknowledged the
    /// corresponding session.update
    config: Arc<RwLock<SessionConfig>>,
    api_key: String,
    base_url: String,
    connector: Arc<dyn TransportConnector>,

    state: Arc<RwLock<ConnectionState>>,
    /// Lock-free fast path for the NotConnected gate
    connected: Arc<AtomicBool>,
    /// Server's acknowledged session view
    remote: Arc<RwLock<Option<RemoteSession>>>,

    outbound: Mutex<Option<mpsc::Sender<OutboundFrame>>>,
    /// Taken once by event_stream()
    events: Mutex<Option<EventStream>>,

    handlers: Arc<RwLock<HandlerMap>>,
    wildcard_handlers: Arc<RwLock<Vec<EventCallback>>>,

    cancel: Mutex<Option<CancellationToken>>,
    drain_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeSession {
    /// Create a session using the WebSocket transport against the
    /// default endpoint.
    pub fn new(config: SessionConfig, api_key: impl Into<String>) -> Self {
        Self::with_connector(config, api_key, Arc::new(WebSocketConnector::new()))
    }

    /// Create a session over a custom transport.
    pub fn with_connector(
        config: SessionConfig,
        api_key: impl Into<String>,
        connector: Arc<dyn TransportConnector>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            api_key: api_key.into(),
            base_url: DEFAULT_REALTIME_URL.to_string(),
            connector,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            connected: Arc::new(AtomicBool::new(false)),
            remote: Arc::new(RwLock::new(None)),
            outbound: Mutex::new(None),
            events: Mutex::new(None),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            wildcard_handlers: Arc::new(RwLock::new(Vec::new())),
            cancel: Mutex::new(None),
            drain_handle: Mutex::new(None),
        }
    }

    /// Override the endpoint base URL (the model query parameter is
    /// appended at connect time).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Whether the session is currently connected.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// The caller's current configuration intent.
    pub async fn config(&self) -> SessionConfig {
        self.config.read().await.clone()
    }

    /// The server's acknowledged session view, if one has arrived.
    pub async fn remote_session(&self) -> Option<RemoteSession> {
        self.remote.read().await.clone()
    }

    /// The server-assigned session id, once session.created arrived.
    pub async fn session_id(&self) -> Option<String> {
        self.remote.read().await.as_ref().map(|s| s.id.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Connect to the endpoint.
    ///
    /// Legal only from `Disconnected` or `Failed`. After the transport
    /// is up, one `session.update` carrying the full configuration is
    /// sent automatically when the configuration differs from the
    /// defaults, before any other client event.
    ///
    /// A configuration error is rejected before any state transition;
    /// only a failed handshake lands the session in `Failed`.
    pub async fn connect(&self) -> RealtimeResult<()> {
        {
            let model = self.config.read().await.model.clone();
            if model.is_empty() {
                return Err(RealtimeError::InvalidConfiguration(
                    "model must not be empty".to_string(),
                ));
            }
            if self.api_key.is_empty() {
                return Err(RealtimeError::InvalidConfiguration(
                    "API key must not be empty".to_string(),
                ));
            }
        }
        {
            let mut state = self.state.write().await;
            match *state {
                ConnectionState::Disconnected | ConnectionState::Failed => {
                    *state = ConnectionState::Connecting;
                }
                other => {
                    return Err(RealtimeError::ConnectionFailed(format!(
                        "connect() is not legal from state {other:?}"
                    )));
                }
            }
        }

        match self.establish().await {
            Ok(()) => {
                *self.state.write().await = ConnectionState::Connected;
                self.connected.store(true, Ordering::SeqCst);
                let config = self.config.read().await.clone();
                if config.requires_update() {
                    self.send_event(ClientEvent::SessionUpdate { session: config })
                        .await?;
                }
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = ConnectionState::Failed;
                Err(e)
            }
        }
    }

    async fn establish(&self) -> RealtimeResult<()> {
        let model = self.config.read().await.model.clone();
        let options = ConnectOptions {
            url: format!("{}?model={}", self.base_url, model),
            api_key: self.api_key.clone(),
        };
        let (sink, inbound) = self.connector.connect(&options).await?;
        tracing::info!(model = %model, "realtime session connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let drain = DrainTask {
            sink,
            inbound,
            outbound_rx,
            events_tx,
            cancel: cancel.clone(),
            state: Arc::clone(&self.state),
            connected: Arc::clone(&self.connected),
            remote: Arc::clone(&self.remote),
            handlers: Arc::clone(&self.handlers),
            wildcard_handlers: Arc::clone(&self.wildcard_handlers),
            assembler: ResponseAssembler::new(),
        };
        let handle = tokio::spawn(drain.run());

        // A fresh connection starts with no acknowledged server view.
        *self.remote.write().await = None;
        *self.outbound.lock().await = Some(outbound_tx);
        *self.events.lock().await = Some(events_rx);
        *self.cancel.lock().await = Some(cancel);
        *self.drain_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Disconnect and release the connection.
    ///
    /// Idempotent. The event stream completes normally; no further
    /// events or callbacks are delivered after this returns.
    pub async fn disconnect(&self) -> RealtimeResult<()> {
        let cancel = self.cancel.lock().await.take();
        let handle = self.drain_handle.lock().await.take();
        *self.outbound.lock().await = None;
        *self.remote.write().await = None;

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "drain task ended abnormally");
        }

        self.connected.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Disconnected;
        tracing::info!("realtime session disconnected");
        Ok(())
    }

    // =========================================================================
    // Event delivery
    // =========================================================================

    /// Take the ordered event stream. Consumable once per connection.
    pub async fn event_stream(&self) -> RealtimeResult<EventStream> {
        self.events
            .lock()
            .await
            .take()
            .ok_or(RealtimeError::NotConnected)
    }

    /// Register a callback for one event kind. Multiple callbacks per
    /// kind are invoked in registration order.
    pub async fn on(&self, kind: EventKind, callback: EventCallback) {
        self.handlers
            .write()
            .await
            .entry(kind)
            .or_default()
            .push(callback);
    }

    /// Register a callback invoked for every received event.
    pub async fn on_any(&self, callback: EventCallback) {
        self.wildcard_handlers.write().await.push(callback);
    }

    // =========================================================================
    // Session configuration
    // =========================================================================

    /// Push a configuration change.
    ///
    /// The local intent is replaced only after the transport accepted
    /// the frame; the server's acknowledgement later lands in
    /// [`Self::remote_session`]. The model is fixed for the lifetime of
    /// the connection and cannot be changed here.
    pub async fn update(&self, config: SessionConfig) -> RealtimeResult<()> {
        let mut config = config;
        config.model = self.config.read().await.model.clone();
        self.send_event(ClientEvent::SessionUpdate {
            session: config.clone(),
        })
        .await?;
        *self.config.write().await = config;
        Ok(())
    }

    // =========================================================================
    // Audio buffer
    // =========================================================================

    /// Append raw audio to the input buffer. The bytes are opaque to
    /// the engine and must match the configured input format.
    pub async fn append_audio(&self, audio: Bytes) -> RealtimeResult<()> {
        self.send_event(ClientEvent::audio_append(&audio)).await
    }

    /// Commit the input buffer into a conversation item. Used with turn
    /// detection disabled; under server VAD the server commits on its own.
    pub async fn commit_audio(&self) -> RealtimeResult<()> {
        self.send_event(ClientEvent::InputAudioBufferCommit).await
    }

    /// Discard all uncommitted buffered audio.
    pub async fn clear_audio_buffer(&self) -> RealtimeResult<()> {
        self.send_event(ClientEvent::InputAudioBufferClear).await
    }

    // =========================================================================
    // Conversation items
    // =========================================================================

    /// Create a conversation item, optionally inserted after an
    /// existing one.
    pub async fn create_item(
        &self,
        item: ConversationItem,
        previous_item_id: Option<String>,
    ) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ConversationItemCreate {
            item,
            previous_item_id,
        })
        .await
    }

    /// Delete a conversation item by id.
    pub async fn delete_item(&self, item_id: impl Into<String>) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ConversationItemDelete {
            item_id: item_id.into(),
        })
        .await
    }

    /// Truncate the trailing audio of an item, typically after an
    /// interruption so the history matches what was actually heard.
    pub async fn truncate_item(
        &self,
        item_id: impl Into<String>,
        content_index: u32,
        audio_end_ms: u32,
    ) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ConversationItemTruncate {
            item_id: item_id.into(),
            content_index,
            audio_end_ms,
        })
        .await
    }

    // =========================================================================
    // Responses
    // =========================================================================

    /// Request a model response, optionally with per-call overrides.
    pub async fn create_response(
        &self,
        overrides: Option<ResponseOverrides>,
    ) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ResponseCreate {
            response: overrides,
        })
        .await
    }

    /// Cancel the in-progress response. The cancelled response still
    /// terminates through its own response.done.
    pub async fn cancel_response(&self) -> RealtimeResult<()> {
        self.send_event(ClientEvent::ResponseCancel).await
    }

    /// Convenience: add a user text message and request a response.
    pub async fn send_text(&self, text: impl Into<String>) -> RealtimeResult<()> {
        self.create_item(ConversationItem::user_text(text), None)
            .await?;
        self.create_response(None).await
    }

    /// Convenience: submit a function call result and request the
    /// follow-up response.
    pub async fn submit_function_result(
        &self,
        call_id: impl Into<String>,
        output: impl Into<String>,
    ) -> RealtimeResult<()> {
        self.create_item(ConversationItem::function_output(call_id, output), None)
            .await?;
        self.create_response(None).await
    }

    // =========================================================================
    // Send path
    // =========================================================================

    /// Encode, stamp a client correlation id, and hand the frame to the
    /// connection task. Resolves once the transport accepted the frame.
    async fn send_event(&self, event: ClientEvent) -> RealtimeResult<()> {
        if !self.is_connected() {
            return Err(RealtimeError::NotConnected);
        }
        let event_id = format!("evt_{}", Uuid::new_v4().simple());
        let frame = event.encode(Some(&event_id))?;

        let tx = self
            .outbound
            .lock()
            .await
            .clone()
            .ok_or(RealtimeError::NotConnected)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        tx.send(OutboundFrame { frame, ack: ack_tx })
            .await
            .map_err(|_| RealtimeError::NotConnected)?;
        ack_rx
            .await
            .map_err(|_| RealtimeError::TransportClosed("connection task exited".to_string()))?
    }
}

impl std::fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("base_url", &self.base_url)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Drain task
// =============================================================================

/// Owns the transport for the lifetime of one connection.
struct DrainTask {
    sink: Box<dyn TransportSink>,
    inbound: TransportStream,
    outbound_rx: mpsc::Receiver<OutboundFrame>,
    events_tx: mpsc::UnboundedSender<RealtimeResult<ServerEvent>>,
    cancel: CancellationToken,
    state: Arc<RwLock<ConnectionState>>,
    connected: Arc<AtomicBool>,
    remote: Arc<RwLock<Option<RemoteSession>>>,
    handlers: Arc<RwLock<HandlerMap>>,
    wildcard_handlers: Arc<RwLock<Vec<EventCallback>>>,
    assembler: ResponseAssembler,
}

impl DrainTask {
    async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    if let Err(e) = self.sink.close().await {
                        tracing::debug!(error = %e, "close frame not delivered");
                    }
                    break;
                }

                outbound = self.outbound_rx.recv() => {
                    match outbound {
                        Some(OutboundFrame { frame, ack }) => {
                            let result = self.sink.send(frame).await;
                            let failed = result.is_err();
                            if let Err(e) = &result {
                                tracing::warn!(error = %e, "outbound send failed");
                            }
                            let _ = ack.send(result);
                            if failed {
                                self.fail(RealtimeError::TransportClosed(
                                    "send failed".to_string(),
                                ))
                                .await;
                                break;
                            }
                        }
                        // Session dropped without disconnect()
                        None => {
                            let _ = self.sink.close().await;
                            break;
                        }
                    }
                }

                inbound = self.inbound.next() => {
                    match inbound {
                        Some(Ok(text)) => self.handle_frame(&text).await,
                        Some(Err(e)) => {
                            self.fail(e).await;
                            break;
                        }
                        None => {
                            self.fail(RealtimeError::TransportClosed(
                                "connection closed by peer".to_string(),
                            ))
                            .await;
                            break;
                        }
                    }
                }
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn handle_frame(&mut self, text: &str) {
        let event = match ServerEvent::decode(text) {
            Ok(event) => event,
            Err(e) => {
                // Malformed frame: reported in place, drain continues.
                tracing::warn!(error = %e, "dropping malformed frame");
                let _ = self.events_tx.send(Err(e));
                return;
            }
        };

        match &event {
            ServerEvent::SessionCreated { session } | ServerEvent::SessionUpdated { session } => {
                tracing::debug!(session_id = %session.id, "server session view updated");
                *self.remote.write().await = Some(session.clone());
            }
            ServerEvent::Error { error } => {
                tracing::warn!(
                    error_type = %error.error_type,
                    message = %error.message,
                    "server reported error"
                );
            }
            ServerEvent::Unrecognized { event_type, .. } => {
                tracing::debug!(event_type = %event_type, "unrecognized event type");
            }
            _ => {}
        }

        // Delta bookkeeping validates response/item ids as a side effect.
        if let Err(e) = self.assembler.absorb(&event) {
            tracing::warn!(error = %e, "inbound event violated protocol");
            let _ = self.events_tx.send(Err(e));
        }

        self.dispatch(&event).await;
        let _ = self.events_tx.send(Ok(event));
    }

    async fn dispatch(&mut self, event: &ServerEvent) {
        let named: Vec<EventCallback> = self
            .handlers
            .read()
            .await
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        for callback in named {
            callback(event.clone()).await;
        }
        let wildcard: Vec<EventCallback> = self.wildcard_handlers.read().await.clone();
        for callback in wildcard {
            callback(event.clone()).await;
        }
    }

    /// Transition to `Failed` and surface the error as the final stream
    /// item.
    async fn fail(&mut self, error: RealtimeError) {
        tracing::error!(error = %error, "connection lost");
        *self.state.write().await = ConnectionState::Failed;
        let _ = self.events_tx.send(Err(error));
    }
}
