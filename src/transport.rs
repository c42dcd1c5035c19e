//! Transport seam between the session engine and the wire.
//!
//! The engine talks to a [`TransportConnector`] rather than a socket, so
//! tests drive it with in-memory channels while production uses the
//! WebSocket connector. A connector hands back the two halves of an
//! established connection: a sink for outbound text frames and a stream
//! of inbound ones.

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::{RealtimeError, RealtimeResult};

/// Value of the `OpenAI-Beta` header required by the realtime endpoint.
pub const REALTIME_BETA_HEADER: &str = "realtime=v1";

/// Parameters for establishing a connection.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Full endpoint URL, including the model query parameter
    pub url: String,
    /// API key sent as a bearer token
    pub api_key: String,
}

/// Outbound half of an established connection.
#[async_trait]
pub trait TransportSink: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> RealtimeResult<()>;

    /// Close the connection.
    async fn close(&mut self) -> RealtimeResult<()>;
}

/// Inbound half of an established connection. Yields text frames until
/// the peer closes; a transport failure is surfaced as an `Err` item.
pub type TransportStream = BoxStream<'static, RealtimeResult<String>>;

/// Establishes connections on behalf of the session engine.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Open a connection and return its split halves.
    async fn connect(
        &self,
        options: &ConnectOptions,
    ) -> RealtimeResult<(Box<dyn TransportSink>, TransportStream)>;
}

// =============================================================================
// WebSocket transport
// =============================================================================

/// Production connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(
        &self,
        options: &ConnectOptions,
    ) -> RealtimeResult<(Box<dyn TransportSink>, TransportStream)> {
        let parsed = url::Url::parse(&options.url)
            .map_err(|e| RealtimeError::InvalidConfiguration(format!("invalid URL: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| {
                RealtimeError::InvalidConfiguration("URL has no host".to_string())
            })?
            .to_string();

        let request = http::Request::builder()
            .uri(&options.url)
            .header("Authorization", format!("Bearer {}", options.api_key))
            .header("OpenAI-Beta", REALTIME_BETA_HEADER)
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::debug!(url = %options.url, "websocket connection established");

        let (ws_sink, ws_stream) = ws_stream.split();

        let inbound: TransportStream = ws_stream
            .filter_map(|message| async move {
                match message {
                    Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                    // Control frames are handled by the library; binary
                    // frames are not part of this protocol.
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => None,
                    Ok(Message::Close(frame)) => {
                        tracing::debug!(?frame, "websocket closed by peer");
                        None
                    }
                    Ok(Message::Frame(_)) => None,
                    Err(e) => Some(Err(RealtimeError::TransportError(e.to_string()))),
                }
            })
            .boxed();

        Ok((Box::new(WebSocketSink { sink: ws_sink }), inbound))
    }
}

struct WebSocketSink {
    sink: futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
}

#[async_trait]
impl TransportSink for WebSocketSink {
    async fn send(&mut self, frame: String) -> RealtimeResult<()> {
        use futures_util::SinkExt;
        self.sink
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| RealtimeError::TransportError(e.to_string()))
    }

    async fn close(&mut self) -> RealtimeResult<()> {
        use futures_util::SinkExt;
        self.sink
            .send(Message::Close(None))
            .await
            .map_err(|e| RealtimeError::TransportError(e.to_string()))
    }
}
