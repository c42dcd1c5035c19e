//! Conversation items and response objects.
//!
//! These are the addressable units both sides reference by id: messages,
//! function calls and their results, and the streamed response objects
//! that own output items. The server is authoritative for ordering; the
//! engine never reorders items.

use serde::{Deserialize, Serialize};

use crate::config::{ToolChoice, ToolDefinition, TranscriptionConfig, TurnDetection};

// =============================================================================
// Conversation Items
// =============================================================================

/// Conversation item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// A user/assistant/system message
    Message,
    /// A function call emitted by the model
    FunctionCall,
    /// A function call result supplied by the caller
    FunctionCallOutput,
}

/// Role of a message item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// System-level instructions
    System,
}

/// Lifecycle status of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Still streaming
    InProgress,
    /// Fully materialized
    Completed,
    /// Ended early
    Incomplete,
}

/// A content part within a conversation item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    /// Text supplied by the caller
    #[serde(rename = "input_text")]
    InputText {
        /// The text content
        text: String,
    },
    /// Audio supplied by the caller
    #[serde(rename = "input_audio")]
    InputAudio {
        /// Base64-encoded audio, if echoed back
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        /// Transcript of the audio, if transcription is enabled
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
    /// Text generated by the model
    #[serde(rename = "text")]
    Text {
        /// The text content
        text: String,
    },
    /// Audio generated by the model
    #[serde(rename = "audio")]
    Audio {
        /// Base64-encoded audio, if present
        #[serde(skip_serializing_if = "Option::is_none")]
        audio: Option<String>,
        /// Transcript of the generated audio
        #[serde(skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
    },
}

/// An addressable conversation-history unit.
///
/// Immutable once created except truncation (shortens trailing audio)
/// and deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item id, assigned by the server when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Item type
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Lifecycle status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    /// Role, for message items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Ordered content parts, for message items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,
    /// Call id, for function items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    /// Function name, for function-call items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// JSON-encoded arguments, for function-call items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    /// Result payload, for function-call-output items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl ConversationItem {
    /// Create a user text message item.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: ItemType::Message,
            status: None,
            role: Some(Role::User),
            content: Some(vec![ContentPart::InputText { text: text.into() }]),
            call_id: None,
            name: None,
            arguments: None,
            output: None,
        }
    }

    /// Create a function call result item for a previously issued call id.
    pub fn function_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: None,
            item_type: ItemType::FunctionCallOutput,
            status: None,
            role: None,
            content: None,
            call_id: Some(call_id.into()),
            name: None,
            arguments: None,
            output: Some(output.into()),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Lifecycle status of a response. Reaches a terminal value exactly once,
/// via response.done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// Streaming output
    InProgress,
    /// Finished normally
    Completed,
    /// Interrupted by response.cancel or VAD
    Cancelled,
    /// Ended with an error
    Failed,
    /// Ended early (token cap, content filter)
    Incomplete,
}

impl ResponseStatus {
    /// Whether this status ends the response lifecycle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResponseStatus::InProgress)
    }
}

/// A streamed response object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response id
    pub id: String,
    /// Lifecycle status
    pub status: ResponseStatus,
    /// Structured details for failed/incomplete/cancelled statuses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_details: Option<serde_json::Value>,
    /// Ordered output items
    #[serde(default)]
    pub output: Vec<ConversationItem>,
    /// Token usage, present on response.done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Token usage for a completed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u32,
    /// Input tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Output tokens
    #[serde(default)]
    pub output_tokens: u32,
    /// Input token split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_token_details: Option<TokenDetails>,
    /// Output token split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_token_details: Option<TokenDetails>,
}

/// Token usage detail split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDetails {
    /// Cached tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u32>,
    /// Text tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_tokens: Option<u32>,
    /// Audio tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_tokens: Option<u32>,
}

/// Rate limit information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Rate limit name (e.g., "requests", "tokens")
    pub name: String,
    /// Limit value
    pub limit: u32,
    /// Remaining value
    pub remaining: u32,
    /// Seconds until reset
    pub reset_seconds: f64,
}

// =============================================================================
// Server-side session mirror
// =============================================================================

/// The server's acknowledged view of the session, delivered by
/// session.created / session.updated. Read-only: the caller's
/// [`crate::config::SessionConfig`] intent is never mutated by inbound
/// events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSession {
    /// Server-assigned session id
    pub id: String,
    /// Negotiated model
    pub model: String,
    /// Expiry timestamp, if the server reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    /// Acknowledged modalities
    #[serde(default)]
    pub modalities: Vec<String>,
    /// Acknowledged instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Acknowledged voice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Acknowledged input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,
    /// Acknowledged output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,
    /// Acknowledged transcription config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    /// Acknowledged turn detection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    /// Acknowledged tools
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Acknowledged tool choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Acknowledged temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Acknowledged output token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<serde_json::Value>,
}
