//! Folds the inbound delta stream into materialized values.
//!
//! Delta fragments are accumulated keyed by (response id, item id,
//! content index) until the matching done event, then emitted as one
//! materialized value. Fragments never concatenate across two different
//! item ids or content indexes. A delta referencing a response or item
//! id never introduced by response.created / response.output_item.added
//! is a protocol violation, surfaced as an error rather than silently
//! dropped.

use std::collections::HashMap;

use base64::prelude::*;

use crate::conversation::{ConversationItem, Response};
use crate::error::{RealtimeError, RealtimeResult};
use crate::events::ServerEvent;

/// A materialized value emitted when a streamed field completes.
#[derive(Debug, Clone, PartialEq)]
pub enum Assembled {
    /// A completed text content part
    Text {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// The assembled text
        text: String,
    },
    /// A completed audio transcript
    Transcript {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// The assembled transcript
        transcript: String,
    },
    /// A completed audio content part
    Audio {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Content index
        content_index: u32,
        /// The assembled raw audio bytes
        audio: Vec<u8>,
    },
    /// A completed function call
    FunctionCall {
        /// Response id
        response_id: String,
        /// Item id
        item_id: String,
        /// Call id, for submitting the result
        call_id: String,
        /// Function name, from the output-item announcement
        name: Option<String>,
        /// JSON-encoded arguments
        arguments: String,
    },
    /// A completed output item
    Item {
        /// Response id
        response_id: String,
        /// The item
        item: ConversationItem,
    },
    /// A response that reached its terminal status
    Response(Response),
}

#[derive(Debug, Default)]
struct PendingItem {
    /// Function name captured from response.output_item.added; the
    /// arguments-done event does not repeat it.
    name: Option<String>,
    call_id: Option<String>,
    text: HashMap<u32, String>,
    transcript: HashMap<u32, String>,
    audio: HashMap<u32, Vec<u8>>,
    arguments: String,
    has_arguments: bool,
}

#[derive(Debug, Default)]
struct PendingResponse {
    items: HashMap<String, PendingItem>,
}

/// Accumulates delta fragments and emits materialized values on the
/// matching done events. Tolerates interleaved deltas from concurrently
/// streaming content parts.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    responses: HashMap<String, PendingResponse>,
}

impl ResponseAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a response id has been introduced and not yet finished.
    pub fn knows_response(&self, response_id: &str) -> bool {
        self.responses.contains_key(response_id)
    }

    /// Absorb one inbound event, returning any values it materialized.
    pub fn absorb(&mut self, event: &ServerEvent) -> RealtimeResult<Vec<Assembled>> {
        match event {
            ServerEvent::ResponseCreated { response }
            | ServerEvent::ResponseInProgress { response } => {
                self.responses.entry(response.id.clone()).or_default();
                Ok(Vec::new())
            }

            ServerEvent::OutputItemAdded {
                response_id, item, ..
            } => {
                let response = self.response_mut(response_id)?;
                let item_id = item.id.clone().unwrap_or_default();
                let pending = response.items.entry(item_id).or_default();
                pending.name = item.name.clone();
                pending.call_id = item.call_id.clone();
                Ok(Vec::new())
            }

            ServerEvent::TextDelta {
                response_id,
                item_id,
                content_index,
                delta,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                item.text.entry(*content_index).or_default().push_str(delta);
                Ok(Vec::new())
            }

            ServerEvent::TextDone {
                response_id,
                item_id,
                content_index,
                text,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                item.text.remove(content_index);
                Ok(vec![Assembled::Text {
                    response_id: response_id.clone(),
                    item_id: item_id.clone(),
                    content_index: *content_index,
                    text: text.clone(),
                }])
            }

            ServerEvent::AudioTranscriptDelta {
                response_id,
                item_id,
                content_index,
                delta,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                item.transcript
                    .entry(*content_index)
                    .or_default()
                    .push_str(delta);
                Ok(Vec::new())
            }

            ServerEvent::AudioTranscriptDone {
                response_id,
                item_id,
                content_index,
                transcript,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                item.transcript.remove(content_index);
                Ok(vec![Assembled::Transcript {
                    response_id: response_id.clone(),
                    item_id: item_id.clone(),
                    content_index: *content_index,
                    transcript: transcript.clone(),
                }])
            }

            ServerEvent::AudioDelta {
                response_id,
                item_id,
                content_index,
                delta,
                ..
            } => {
                let bytes = BASE64_STANDARD.decode(delta).map_err(|e| {
                    RealtimeError::ProtocolViolation(format!("invalid base64 audio delta: {e}"))
                })?;
                let item = self.item_mut(response_id, item_id)?;
                item.audio
                    .entry(*content_index)
                    .or_default()
                    .extend_from_slice(&bytes);
                Ok(Vec::new())
            }

            ServerEvent::AudioDone {
                response_id,
                item_id,
                content_index,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                let audio = item.audio.remove(content_index).unwrap_or_default();
                Ok(vec![Assembled::Audio {
                    response_id: response_id.clone(),
                    item_id: item_id.clone(),
                    content_index: *content_index,
                    audio,
                }])
            }

            ServerEvent::FunctionCallArgumentsDelta {
                response_id,
                item_id,
                delta,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                item.arguments.push_str(delta);
                item.has_arguments = true;
                Ok(Vec::new())
            }

            ServerEvent::FunctionCallArgumentsDone {
                response_id,
                item_id,
                call_id,
                arguments,
                ..
            } => {
                let item = self.item_mut(response_id, item_id)?;
                item.arguments.clear();
                item.has_arguments = false;
                let name = item.name.clone();
                Ok(vec![Assembled::FunctionCall {
                    response_id: response_id.clone(),
                    item_id: item_id.clone(),
                    call_id: call_id.clone(),
                    name,
                    arguments: arguments.clone(),
                }])
            }

            ServerEvent::OutputItemDone {
                response_id, item, ..
            } => {
                self.response_mut(response_id)?;
                Ok(vec![Assembled::Item {
                    response_id: response_id.clone(),
                    item: item.clone(),
                }])
            }

            ServerEvent::ResponseDone { response } => {
                let pending = self.responses.remove(&response.id).ok_or_else(|| {
                    RealtimeError::ProtocolViolation(format!(
                        "response.done for unknown response id {}",
                        response.id
                    ))
                })?;
                let mut out = Self::flush(&response.id, pending);
                out.push(Assembled::Response(response.clone()));
                Ok(out)
            }

            _ => Ok(Vec::new()),
        }
    }

    /// Materialize whatever a finished response still had accumulated.
    /// Deterministic order: by item id, then content index.
    fn flush(response_id: &str, pending: PendingResponse) -> Vec<Assembled> {
        let mut out = Vec::new();
        let mut items: Vec<_> = pending.items.into_iter().collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        for (item_id, item) in items {
            let mut texts: Vec<_> = item.text.into_iter().collect();
            texts.sort_by_key(|(idx, _)| *idx);
            for (content_index, text) in texts {
                out.push(Assembled::Text {
                    response_id: response_id.to_string(),
                    item_id: item_id.clone(),
                    content_index,
                    text,
                });
            }
            let mut transcripts: Vec<_> = item.transcript.into_iter().collect();
            transcripts.sort_by_key(|(idx, _)| *idx);
            for (content_index, transcript) in transcripts {
                out.push(Assembled::Transcript {
                    response_id: response_id.to_string(),
                    item_id: item_id.clone(),
                    content_index,
                    transcript,
                });
            }
            let mut audio: Vec<_> = item.audio.into_iter().collect();
            audio.sort_by_key(|(idx, _)| *idx);
            for (content_index, bytes) in audio {
                out.push(Assembled::Audio {
                    response_id: response_id.to_string(),
                    item_id: item_id.clone(),
                    content_index,
                    audio: bytes,
                });
            }
            if item.has_arguments {
                out.push(Assembled::FunctionCall {
                    response_id: response_id.to_string(),
                    item_id: item_id.clone(),
                    call_id: item.call_id.unwrap_or_default(),
                    name: item.name,
                    arguments: item.arguments,
                });
            }
        }
        out
    }

    fn response_mut(&mut self, response_id: &str) -> RealtimeResult<&mut PendingResponse> {
        self.responses.get_mut(response_id).ok_or_else(|| {
            RealtimeError::ProtocolViolation(format!(
                "event references unknown response id {response_id}"
            ))
        })
    }

    fn item_mut(&mut self, response_id: &str, item_id: &str) -> RealtimeResult<&mut PendingItem> {
        self.response_mut(response_id)?
            .items
            .get_mut(item_id)
            .ok_or_else(|| {
                RealtimeError::ProtocolViolation(format!(
                    "event references unknown item id {item_id} in response {response_id}"
                ))
            })
    }
}
