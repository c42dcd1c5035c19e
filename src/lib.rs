//! Client-side engine for real-time bidirectional voice/text sessions.
//!
//! Manages a WebSocket session against a realtime generative-AI
//! endpoint: connection lifecycle, the typed event vocabulary, input
//! audio buffering, turn-taking, interruption, and streamed response
//! assembly.
//!
//! # Example
//!
//! ```rust,ignore
//! use voicewire::{RealtimeSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> voicewire::RealtimeResult<()> {
//!     let config = SessionConfig::voice_conversation("gpt-4o-realtime-preview")
//!         .instructions("You are a helpful assistant.");
//!     let session = RealtimeSession::new(config, std::env::var("OPENAI_API_KEY").unwrap());
//!
//!     session.connect().await?;
//!     let mut events = session.event_stream().await?;
//!
//!     session.send_text("Hello!").await?;
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event?);
//!     }
//!     session.disconnect().await
//! }
//! ```

pub mod assembly;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod session;
pub mod transport;

pub use assembly::{Assembled, ResponseAssembler};
pub use config::{
    AudioFormat, DEFAULT_REALTIME_URL, DEFAULT_SAMPLE_RATE, MaxTokens, Modality, SessionConfig,
    ToolChoice, ToolDefinition, TranscriptionConfig, TurnDetection, Voice,
};
pub use conversation::{
    ContentPart, ConversationItem, ItemStatus, ItemType, RateLimit, RemoteSession, Response,
    ResponseStatus, Role, TokenDetails, Usage,
};
pub use error::{RealtimeError, RealtimeResult};
pub use events::{
    ClientEvent, ConversationInfo, ErrorPayload, EventKind, ResponseOverrides, ServerEvent,
};
pub use session::{ConnectionState, EventCallback, EventStream, RealtimeSession};
pub use transport::{ConnectOptions, TransportConnector, TransportSink, WebSocketConnector};
