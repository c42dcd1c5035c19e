//! Wire event vocabulary and codec.
//!
//! Every message is a flat JSON object with a required `type`
//! discriminator; an event's own fields flatten into the same top level
//! as the wrapper, never nested under a payload key. Wire field names are
//! snake_case (`response_id`, `item_id`, `output_index`, `content_index`).
//!
//! Client events (sent to server):
//! - session.update - Update session configuration
//! - input_audio_buffer.append - Append audio to buffer
//! - input_audio_buffer.commit - Commit audio buffer
//! - input_audio_buffer.clear - Clear audio buffer
//! - conversation.item.create - Add item to conversation
//! - conversation.item.truncate - Truncate trailing audio of an item
//! - conversation.item.delete - Delete conversation item
//! - response.create - Generate a response
//! - response.cancel - Cancel current response
//!
//! Server events (received from server) cover the session, conversation,
//! input-audio-buffer, transcription, response/output-item/content-part
//! lifecycles, the per-field delta/done streams, and rate limits. A frame
//! with an unknown `type` decodes to [`ServerEvent::Unrecognized`] and is
//! never fatal.

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{MaxTokens, Modality, SessionConfig, ToolChoice, ToolDefinition, Voice};
use crate::conversation::{ContentPart, ConversationItem, RateLimit, RemoteSession, Response};
use crate::error::{RealtimeError, RealtimeResult};

// =============================================================================
// Response Overrides
// =============================================================================

/// Per-call overrides for response.create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseOverrides {
    /// Override the enabled modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,
    /// Override the system instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Override the voice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    /// Override the temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Override the output token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxTokens>,
    /// Override the tool list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Override the tool choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },

    /// Commit the input audio buffer into a conversation item
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Clear the input audio buffer
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,

    /// Create a conversation item
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to create
        item: ConversationItem,
        /// Previous item id to insert after
        #[serde(skip_serializing_if = "Option::is_none")]
        previous_item_id: Option<String>,
    },

    /// Truncate the trailing audio of a conversation item
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// New audio end in ms
        audio_end_ms: u32,
    },

    /// Delete a conversation item
    #[serde(rename = "conversation.item.delete")]
    ConversationItemDelete {
        /// Item id
        item_id: String,
    },

    /// Create a response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Optional per-call overrides
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<ResponseOverrides>,
    },

    /// Cancel the in-progress response
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    /// Create an audio append event from raw bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }

    /// Encode for the wire, injecting a top-level client correlation id
    /// when one is supplied.
    pub fn encode(&self, event_id: Option<&str>) -> RealtimeResult<String> {
        let mut value = serde_json::to_value(self)?;
        if let (Some(id), Some(map)) = (event_id, value.as_object_mut()) {
            map.insert("event_id".to_string(), Value::String(id.to_string()));
        }
        serde_json::to_string(&value).map_err(Into::into)
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events received from the realtime endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Error reported by the server
    #[serde(rename = "error")]
    Error {
        /// Error details, forwarded verbatim
        error: ErrorPayload,
    },

    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Server-side session mirror
        session: RemoteSession,
    },

    /// Session configuration acknowledged
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Server-side session mirror
        session: RemoteSession,
    },

    /// Conversation created
    #[serde(rename = "conversation.created")]
    ConversationCreated {
        /// Conversation details
        conversation: ConversationInfo,
    },

    /// Conversation item created
    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {
        /// Previous item id
        #[serde(default)]
        previous_item_id: Option<String>,
        /// Created item
        item: ConversationItem,
    },

    /// Conversation item truncated
    #[serde(rename = "conversation.item.truncated")]
    ConversationItemTruncated {
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// New audio end in ms
        audio_end_ms: u32,
    },

    /// Conversation item deleted
    #[serde(rename = "conversation.item.deleted")]
    ConversationItemDeleted {
        /// Item id
        item_id: String,
    },

    /// Input audio transcription completed
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// Transcript text
        transcript: String,
    },

    /// Input audio transcription failed
    #[serde(rename = "conversation.item.input_audio_transcription.failed")]
    TranscriptionFailed {
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// Error details
        error: ErrorPayload,
    },

    /// Audio buffer committed into an item
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        /// Previous item id
        #[serde(default)]
        previous_item_id: Option<String>,
        /// New item id
        item_id: String,
    },

    /// Audio buffer cleared
    #[serde(rename = "input_audio_buffer.cleared")]
    InputAudioBufferCleared,

    /// Speech started (server VAD)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        /// Audio start timestamp in ms
        audio_start_ms: u64,
        /// Item id the speech will commit into
        item_id: String,
    },

    /// Speech stopped (server VAD)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        /// Audio end timestamp in ms
        audio_end_ms: u64,
        /// Item id the speech committed into
        item_id: String,
    },

    /// Response created
    #[serde(rename = "response.created")]
    ResponseCreated {
        /// Response object
        response: Response,
    },

    /// Response generation in progress
    #[serde(rename = "response.in_progress")]
    ResponseInProgress {
        /// Response object
        response: Response,
    },

    /// Response reached a terminal status
    #[serde(rename = "response.done")]
    ResponseDone {
        /// Final response object
        response: Response,
    },

    /// Output item added to a response
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// Response id
        response_id: String,
        /// Output index
        output_index: u32,
        /// The item
        item: ConversationItem,
    },

    /// Output item done
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        /// Response id
        response_id: String,
        /// Output index
        output_index: u32,
        /// The completed item
        item: ConversationItem,
    },

    /// Content part added
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// The content part
        part: ContentPart,
    },

    /// Content part done
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// The completed content part
        part: ContentPart,
    },

    /// Text delta
    #[serde(rename = "response.text.delta")]
    TextDelta {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// Text fragment
        delta: String,
    },

    /// Text done
    #[serde(rename = "response.text.done")]
    TextDone {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// Full text
        text: String,
    },

    /// Audio transcript delta
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// Transcript fragment
        delta: String,
    },

    /// Audio transcript done
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// Full transcript
        transcript: String,
    },

    /// Audio delta (base64-encoded chunk)
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
        /// Base64-encoded audio fragment
        delta: String,
    },

    /// Audio done
    #[serde(rename = "response.audio.done")]
    AudioDone {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Content index
        content_index: u32,
    },

    /// Function call arguments delta
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Call id
        call_id: String,
        /// Arguments fragment
        delta: String,
    },

    /// Function call arguments done
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Output index
        output_index: u32,
        /// Call id
        call_id: String,
        /// Full JSON-encoded arguments
        arguments: String,
    },

    /// Rate limits updated
    #[serde(rename = "rate_limits.updated")]
    RateLimitsUpdated {
        /// Rate limit entries
        rate_limits: Vec<RateLimit>,
    },

    /// A frame whose `type` is outside the known vocabulary. Reported,
    /// never fatal; the raw payload is preserved for the caller.
    #[serde(skip)]
    Unrecognized {
        /// The unrecognized `type` discriminator
        event_type: String,
        /// The full raw frame
        payload: Value,
    },
}

/// Conversation details from conversation.created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationInfo {
    /// Conversation id
    #[serde(default)]
    pub id: Option<String>,
}

/// Error details reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error type
    #[serde(rename = "type")]
    pub error_type: String,
    /// Machine-readable code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Parameter that caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Client event id that triggered the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl ErrorPayload {
    /// Forward as a [`RealtimeError`] without losing any field.
    pub fn to_error(&self) -> RealtimeError {
        RealtimeError::ServerError {
            error_type: self.error_type.clone(),
            code: self.code.clone(),
            message: self.message.clone(),
            param: self.param.clone(),
        }
    }
}

/// Wire `type` strings of the known inbound vocabulary.
const KNOWN_SERVER_TYPES: &[&str] = &[
    "error",
    "session.created",
    "session.updated",
    "conversation.created",
    "conversation.item.created",
    "conversation.item.truncated",
    "conversation.item.deleted",
    "conversation.item.input_audio_transcription.completed",
    "conversation.item.input_audio_transcription.failed",
    "input_audio_buffer.committed",
    "input_audio_buffer.cleared",
    "input_audio_buffer.speech_started",
    "input_audio_buffer.speech_stopped",
    "response.created",
    "response.in_progress",
    "response.done",
    "response.output_item.added",
    "response.output_item.done",
    "response.content_part.added",
    "response.content_part.done",
    "response.text.delta",
    "response.text.done",
    "response.audio_transcript.delta",
    "response.audio_transcript.done",
    "response.audio.delta",
    "response.audio.done",
    "response.function_call_arguments.delta",
    "response.function_call_arguments.done",
    "rate_limits.updated",
];

impl ServerEvent {
    /// Decode one wire frame.
    ///
    /// The `type` discriminator is extracted first; a frame whose `type`
    /// is outside the known vocabulary yields [`ServerEvent::Unrecognized`].
    /// A frame with no `type`, or a known `type` with a malformed payload,
    /// is a protocol violation.
    pub fn decode(text: &str) -> RealtimeResult<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            RealtimeError::ProtocolViolation(format!("frame is not valid JSON: {e}"))
        })?;
        let event_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RealtimeError::ProtocolViolation("frame missing type discriminator".to_string())
            })?
            .to_string();

        if !KNOWN_SERVER_TYPES.contains(&event_type.as_str()) {
            return Ok(ServerEvent::Unrecognized {
                event_type,
                payload: value,
            });
        }

        serde_json::from_value(value).map_err(|e| {
            RealtimeError::ProtocolViolation(format!("malformed {event_type} frame: {e}"))
        })
    }

    /// Decode base64 audio from an audio delta.
    pub fn decode_audio_delta(delta: &str) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(delta)
    }

    /// The wire `type` of this event.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Error { .. } => "error",
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::ConversationCreated { .. } => "conversation.created",
            Self::ConversationItemCreated { .. } => "conversation.item.created",
            Self::ConversationItemTruncated { .. } => "conversation.item.truncated",
            Self::ConversationItemDeleted { .. } => "conversation.item.deleted",
            Self::TranscriptionCompleted { .. } => {
                "conversation.item.input_audio_transcription.completed"
            }
            Self::TranscriptionFailed { .. } => {
                "conversation.item.input_audio_transcription.failed"
            }
            Self::InputAudioBufferCommitted { .. } => "input_audio_buffer.committed",
            Self::InputAudioBufferCleared => "input_audio_buffer.cleared",
            Self::SpeechStarted { .. } => "input_audio_buffer.speech_started",
            Self::SpeechStopped { .. } => "input_audio_buffer.speech_stopped",
            Self::ResponseCreated { .. } => "response.created",
            Self::ResponseInProgress { .. } => "response.in_progress",
            Self::ResponseDone { .. } => "response.done",
            Self::OutputItemAdded { .. } => "response.output_item.added",
            Self::OutputItemDone { .. } => "response.output_item.done",
            Self::ContentPartAdded { .. } => "response.content_part.added",
            Self::ContentPartDone { .. } => "response.content_part.done",
            Self::TextDelta { .. } => "response.text.delta",
            Self::TextDone { .. } => "response.text.done",
            Self::AudioTranscriptDelta { .. } => "response.audio_transcript.delta",
            Self::AudioTranscriptDone { .. } => "response.audio_transcript.done",
            Self::AudioDelta { .. } => "response.audio.delta",
            Self::AudioDone { .. } => "response.audio.done",
            Self::FunctionCallArgumentsDelta { .. } => "response.function_call_arguments.delta",
            Self::FunctionCallArgumentsDone { .. } => "response.function_call_arguments.done",
            Self::RateLimitsUpdated { .. } => "rate_limits.updated",
            Self::Unrecognized { event_type, .. } => event_type,
        }
    }

    /// The kind discriminator, for handler registration.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Error { .. } => EventKind::Error,
            Self::SessionCreated { .. } => EventKind::SessionCreated,
            Self::SessionUpdated { .. } => EventKind::SessionUpdated,
            Self::ConversationCreated { .. } => EventKind::ConversationCreated,
            Self::ConversationItemCreated { .. } => EventKind::ConversationItemCreated,
            Self::ConversationItemTruncated { .. } => EventKind::ConversationItemTruncated,
            Self::ConversationItemDeleted { .. } => EventKind::ConversationItemDeleted,
            Self::TranscriptionCompleted { .. } => EventKind::TranscriptionCompleted,
            Self::TranscriptionFailed { .. } => EventKind::TranscriptionFailed,
            Self::InputAudioBufferCommitted { .. } => EventKind::InputAudioBufferCommitted,
            Self::InputAudioBufferCleared => EventKind::InputAudioBufferCleared,
            Self::SpeechStarted { .. } => EventKind::SpeechStarted,
            Self::SpeechStopped { .. } => EventKind::SpeechStopped,
            Self::ResponseCreated { .. } => EventKind::ResponseCreated,
            Self::ResponseInProgress { .. } => EventKind::ResponseInProgress,
            Self::ResponseDone { .. } => EventKind::ResponseDone,
            Self::OutputItemAdded { .. } => EventKind::OutputItemAdded,
            Self::OutputItemDone { .. } => EventKind::OutputItemDone,
            Self::ContentPartAdded { .. } => EventKind::ContentPartAdded,
            Self::ContentPartDone { .. } => EventKind::ContentPartDone,
            Self::TextDelta { .. } => EventKind::TextDelta,
            Self::TextDone { .. } => EventKind::TextDone,
            Self::AudioTranscriptDelta { .. } => EventKind::AudioTranscriptDelta,
            Self::AudioTranscriptDone { .. } => EventKind::AudioTranscriptDone,
            Self::AudioDelta { .. } => EventKind::AudioDelta,
            Self::AudioDone { .. } => EventKind::AudioDone,
            Self::FunctionCallArgumentsDelta { .. } => EventKind::FunctionCallArgumentsDelta,
            Self::FunctionCallArgumentsDone { .. } => EventKind::FunctionCallArgumentsDone,
            Self::RateLimitsUpdated { .. } => EventKind::RateLimitsUpdated,
            Self::Unrecognized { .. } => EventKind::Unrecognized,
        }
    }
}

/// Fieldless discriminator for [`ServerEvent`], used as the key of the
/// named-type callback registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum EventKind {
    Error,
    SessionCreated,
    SessionUpdated,
    ConversationCreated,
    ConversationItemCreated,
    ConversationItemTruncated,
    ConversationItemDeleted,
    TranscriptionCompleted,
    TranscriptionFailed,
    InputAudioBufferCommitted,
    InputAudioBufferCleared,
    SpeechStarted,
    SpeechStopped,
    ResponseCreated,
    ResponseInProgress,
    ResponseDone,
    OutputItemAdded,
    OutputItemDone,
    ContentPartAdded,
    ContentPartDone,
    TextDelta,
    TextDone,
    AudioTranscriptDelta,
    AudioTranscriptDone,
    AudioDelta,
    AudioDone,
    FunctionCallArgumentsDelta,
    FunctionCallArgumentsDone,
    RateLimitsUpdated,
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use serde_json::json;

    #[test]
    fn test_client_event_type_tags() {
        let event = ClientEvent::InputAudioBufferCommit;
        let json = event.encode(None).unwrap();
        assert!(json.contains("\"type\":\"input_audio_buffer.commit\""));

        let event = ClientEvent::ResponseCancel;
        let json = event.encode(None).unwrap();
        assert!(json.contains("response.cancel"));
    }

    #[test]
    fn test_encode_injects_event_id() {
        let event = ClientEvent::InputAudioBufferClear;
        let encoded = event.encode(Some("evt_42")).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["event_id"], "evt_42");
        assert_eq!(value["type"], "input_audio_buffer.clear");
    }

    #[test]
    fn test_fields_flatten_into_top_level() {
        let event = ClientEvent::ConversationItemTruncate {
            item_id: "item_1".to_string(),
            content_index: 0,
            audio_end_ms: 1500,
        };
        let value: Value = serde_json::from_str(&event.encode(None).unwrap()).unwrap();
        // No nested payload key: the fields sit beside "type".
        assert_eq!(value["item_id"], "item_1");
        assert_eq!(value["content_index"], 0);
        assert_eq!(value["audio_end_ms"], 1500);
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_wire_casing_of_text_delta() {
        let event = ServerEvent::TextDelta {
            response_id: "r1".to_string(),
            item_id: "i1".to_string(),
            output_index: 0,
            content_index: 0,
            delta: "hi".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "response.text.delta");
        assert_eq!(value["response_id"], "r1");
        assert_eq!(value["item_id"], "i1");
        assert_eq!(value["output_index"], 0);
        assert_eq!(value["content_index"], 0);
        assert_eq!(value["delta"], "hi");
    }

    #[test]
    fn test_audio_append_roundtrip() {
        let data = vec![0u8, 1, 2, 3];
        let event = ClientEvent::audio_append(&data);
        match &event {
            ClientEvent::InputAudioBufferAppend { audio } => {
                assert_eq!(BASE64_STANDARD.decode(audio).unwrap(), data);
            }
            _ => panic!("wrong event type"),
        }
        assert_eq!(
            ServerEvent::decode_audio_delta(&BASE64_STANDARD.encode(&data)).unwrap(),
            data
        );
    }

    #[test]
    fn test_session_update_roundtrip_with_nested_tool_schema() {
        let schema = json!({
            "type": "object",
            "properties": {
                "filters": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "field": {"type": "string"},
                            "range": {
                                "type": "object",
                                "properties": {
                                    "min": {"type": "number"},
                                    "max": {"type": "number"}
                                }
                            }
                        }
                    }
                }
            }
        });
        let config = SessionConfig::with_tools(
            "gpt-4o-realtime-preview",
            vec![crate::config::ToolDefinition::function(
                "search",
                "Search with filters",
                schema,
            )],
        );
        let event = ClientEvent::SessionUpdate {
            session: config.clone(),
        };
        let encoded = event.encode(Some("evt_1")).unwrap();
        let decoded: ClientEvent = serde_json::from_str(&encoded).unwrap();
        match decoded {
            ClientEvent::SessionUpdate { session } => {
                // model is skipped on the wire and defaults back to empty
                assert_eq!(session.tools, config.tools);
                assert_eq!(session.modalities, config.modalities);
            }
            _ => panic!("wrong event type"),
        }
    }

    #[test]
    fn test_server_event_decode_error() {
        let json = r#"{
            "type": "error",
            "event_id": "event_1",
            "error": {
                "type": "invalid_request_error",
                "code": "missing_field",
                "message": "Test error",
                "param": "item_id"
            }
        }"#;
        match ServerEvent::decode(json).unwrap() {
            ServerEvent::Error { error } => {
                assert_eq!(error.message, "Test error");
                match error.to_error() {
                    RealtimeError::ServerError {
                        error_type,
                        code,
                        param,
                        ..
                    } => {
                        assert_eq!(error_type, "invalid_request_error");
                        assert_eq!(code.as_deref(), Some("missing_field"));
                        assert_eq!(param.as_deref(), Some("item_id"));
                    }
                    other => panic!("unexpected error: {other}"),
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_unrecognized_not_fatal() {
        let json = r#"{"type": "some.future.event", "detail": 7}"#;
        match ServerEvent::decode(json).unwrap() {
            ServerEvent::Unrecognized {
                event_type,
                payload,
            } => {
                assert_eq!(event_type, "some.future.event");
                assert_eq!(payload["detail"], 7);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_missing_type_is_protocol_violation() {
        let result = ServerEvent::decode(r#"{"delta": "hi"}"#);
        assert!(matches!(result, Err(RealtimeError::ProtocolViolation(_))));
    }

    #[test]
    fn test_malformed_known_frame_is_protocol_violation() {
        // known type, payload missing required fields
        let result = ServerEvent::decode(r#"{"type": "response.text.delta"}"#);
        assert!(matches!(result, Err(RealtimeError::ProtocolViolation(_))));
    }

    #[test]
    fn test_server_event_roundtrips() {
        let events = vec![
            ServerEvent::InputAudioBufferCleared,
            ServerEvent::SpeechStarted {
                audio_start_ms: 120,
                item_id: "item_a".to_string(),
            },
            ServerEvent::TextDone {
                response_id: "r1".to_string(),
                item_id: "i1".to_string(),
                output_index: 0,
                content_index: 0,
                text: "Hello".to_string(),
            },
            ServerEvent::RateLimitsUpdated {
                rate_limits: vec![RateLimit {
                    name: "requests".to_string(),
                    limit: 100,
                    remaining: 99,
                    reset_seconds: 3.5,
                }],
            },
        ];
        for event in events {
            let encoded = serde_json::to_string(&event).unwrap();
            let decoded = ServerEvent::decode(&encoded).unwrap();
            assert_eq!(decoded, event);
            assert_eq!(decoded.kind(), event.kind());
        }
    }

    fn sample_item() -> ConversationItem {
        ConversationItem::user_text("x")
    }

    fn sample_response() -> Response {
        serde_json::from_value(json!({"id": "r", "status": "in_progress"})).unwrap()
    }

    fn sample_session() -> RemoteSession {
        serde_json::from_value(json!({"id": "s", "model": "m"})).unwrap()
    }

    fn sample_error() -> ErrorPayload {
        ErrorPayload {
            error_type: "server_error".to_string(),
            code: None,
            message: "boom".to_string(),
            param: None,
            event_id: None,
        }
    }

    /// One instance of every decodable variant.
    fn all_decodable_variants() -> Vec<ServerEvent> {
        let part = ContentPart::Text {
            text: "t".to_string(),
        };
        vec![
            ServerEvent::Error {
                error: sample_error(),
            },
            ServerEvent::SessionCreated {
                session: sample_session(),
            },
            ServerEvent::SessionUpdated {
                session: sample_session(),
            },
            ServerEvent::ConversationCreated {
                conversation: ConversationInfo {
                    id: Some("c".to_string()),
                },
            },
            ServerEvent::ConversationItemCreated {
                previous_item_id: None,
                item: sample_item(),
            },
            ServerEvent::ConversationItemTruncated {
                item_id: "i".to_string(),
                content_index: 0,
                audio_end_ms: 10,
            },
            ServerEvent::ConversationItemDeleted {
                item_id: "i".to_string(),
            },
            ServerEvent::TranscriptionCompleted {
                item_id: "i".to_string(),
                content_index: 0,
                transcript: "t".to_string(),
            },
            ServerEvent::TranscriptionFailed {
                item_id: "i".to_string(),
                content_index: 0,
                error: sample_error(),
            },
            ServerEvent::InputAudioBufferCommitted {
                previous_item_id: None,
                item_id: "i".to_string(),
            },
            ServerEvent::InputAudioBufferCleared,
            ServerEvent::SpeechStarted {
                audio_start_ms: 0,
                item_id: "i".to_string(),
            },
            ServerEvent::SpeechStopped {
                audio_end_ms: 5,
                item_id: "i".to_string(),
            },
            ServerEvent::ResponseCreated {
                response: sample_response(),
            },
            ServerEvent::ResponseInProgress {
                response: sample_response(),
            },
            ServerEvent::ResponseDone {
                response: sample_response(),
            },
            ServerEvent::OutputItemAdded {
                response_id: "r".to_string(),
                output_index: 0,
                item: sample_item(),
            },
            ServerEvent::OutputItemDone {
                response_id: "r".to_string(),
                output_index: 0,
                item: sample_item(),
            },
            ServerEvent::ContentPartAdded {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                part: part.clone(),
            },
            ServerEvent::ContentPartDone {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                part,
            },
            ServerEvent::TextDelta {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                delta: "d".to_string(),
            },
            ServerEvent::TextDone {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                text: "t".to_string(),
            },
            ServerEvent::AudioTranscriptDelta {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                delta: "d".to_string(),
            },
            ServerEvent::AudioTranscriptDone {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                transcript: "t".to_string(),
            },
            ServerEvent::AudioDelta {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
                delta: BASE64_STANDARD.encode([0u8]),
            },
            ServerEvent::AudioDone {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                content_index: 0,
            },
            ServerEvent::FunctionCallArgumentsDelta {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                call_id: "c".to_string(),
                delta: "{".to_string(),
            },
            ServerEvent::FunctionCallArgumentsDone {
                response_id: "r".to_string(),
                item_id: "i".to_string(),
                output_index: 0,
                call_id: "c".to_string(),
                arguments: "{}".to_string(),
            },
            ServerEvent::RateLimitsUpdated {
                rate_limits: vec![],
            },
        ]
    }

    #[test]
    fn test_known_types_stay_in_lockstep_with_variants() {
        // The table and the serde rename tags must agree, or decode
        // misclassifies a known event as Unrecognized.
        let events = all_decodable_variants();
        assert_eq!(events.len(), KNOWN_SERVER_TYPES.len());

        let mut seen = std::collections::HashSet::new();
        for event in &events {
            let wire_type = event.event_type();
            assert!(
                KNOWN_SERVER_TYPES.contains(&wire_type),
                "{wire_type} missing from the known-types table"
            );
            assert!(seen.insert(wire_type), "{wire_type} listed twice");
        }

        // And each one must actually decode back to itself.
        for event in events {
            let encoded = serde_json::to_string(&event).unwrap();
            let decoded = ServerEvent::decode(&encoded).unwrap();
            assert_eq!(decoded.kind(), event.kind());
            assert!(!matches!(decoded, ServerEvent::Unrecognized { .. }));
        }
    }
}
