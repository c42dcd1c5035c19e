//! Session configuration types.
//!
//! This module contains the negotiable session contract and its
//! sub-policies:
//! - Model, voice and audio-format selection
//! - Input audio transcription
//! - Turn detection (server VAD)
//! - Tool definitions and tool-choice strategy
//!
//! The configuration is the caller's intent. The server's acknowledged
//! view arrives separately via `session.created`/`session.updated` and is
//! exposed as a read-only mirror ([`crate::conversation::RemoteSession`]).

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default realtime WebSocket endpoint.
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Default audio sample rate for PCM16 streams.
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

// =============================================================================
// Voices
// =============================================================================

/// Available voices for audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    /// Ash voice
    Ash,
    /// Ballad voice
    Ballad,
    /// Coral voice
    Coral,
    /// Echo voice
    Echo,
    /// Sage voice
    Sage,
    /// Shimmer voice
    Shimmer,
    /// Verse voice
    Verse,
}

impl Voice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Supported audio formats.
///
/// The audio payload itself is opaque to the engine; the format only
/// rides in the negotiated session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// PCM 16-bit signed little-endian (default)
    #[default]
    Pcm16,
    /// G.711 u-law (8-bit companded)
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
    /// G.711 a-law (8-bit companded)
    #[serde(rename = "g711_alaw")]
    G711Alaw,
}

impl AudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
            Self::G711Alaw => "g711_alaw",
        }
    }

    /// Get the sample rate for this format.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm16 => DEFAULT_SAMPLE_RATE,
            Self::G711Ulaw | Self::G711Alaw => 8000,
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pcm16" | "pcm" | "linear16" => Self::Pcm16,
            "g711_ulaw" | "ulaw" | "mulaw" => Self::G711Ulaw,
            "g711_alaw" | "alaw" => Self::G711Alaw,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Independently enabled response channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text output
    Text,
    /// Audio output
    Audio,
}

impl Modality {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }
}

// =============================================================================
// Sub-policies
// =============================================================================

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

impl TranscriptionConfig {
    /// Create a transcription config for the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold (0.0 to 1.0)
        #[serde(skip_serializing_if = "Option::is_none")]
        threshold: Option<f32>,
        /// Amount of audio to include before detected speech (ms)
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix_padding_ms: Option<u32>,
        /// Silence duration before end of turn (ms)
        #[serde(skip_serializing_if = "Option::is_none")]
        silence_duration_ms: Option<u32>,
        /// Whether the server auto-creates a response on turn end
        #[serde(skip_serializing_if = "Option::is_none")]
        create_response: Option<bool>,
    },
    /// No automatic turn detection
    #[serde(rename = "none")]
    None {},
}

impl Default for TurnDetection {
    fn default() -> Self {
        TurnDetection::ServerVad {
            threshold: Some(0.5),
            prefix_padding_ms: Some(300),
            silence_duration_ms: Some(200),
            create_response: Some(true),
        }
    }
}

impl TurnDetection {
    /// Turn detection disabled; the caller commits audio manually.
    pub fn disabled() -> Self {
        TurnDetection::None {}
    }
}

// =============================================================================
// Tools
// =============================================================================

/// A callable tool exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type (always "function")
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    /// Function name
    pub name: String,
    /// Function description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema for parameters; nested to arbitrary depth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

fn default_tool_type() -> String {
    "function".to_string()
}

impl ToolDefinition {
    /// Create a function tool definition.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: default_tool_type(),
            name: name.into(),
            description: Some(description.into()),
            parameters: Some(parameters),
        }
    }
}

/// Tool choice strategy.
///
/// The wire encoding is asymmetric: `auto`/`none`/`required` are bare
/// strings, a named function is `{"type": "function", "name": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// Let the model decide (default)
    #[default]
    Auto,
    /// Never call tools
    None,
    /// A tool call is required
    Required,
    /// Force a specific function
    Function {
        /// Name of the function to call
        name: String,
    },
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Required => serializer.serialize_str("required"),
            ToolChoice::Function { name } => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "function")?;
                map.serialize_entry("name", name)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ToolChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => match s.as_str() {
                "auto" => Ok(ToolChoice::Auto),
                "none" => Ok(ToolChoice::None),
                "required" => Ok(ToolChoice::Required),
                other => Err(D::Error::custom(format!(
                    "unknown tool_choice string: {other}"
                ))),
            },
            serde_json::Value::Object(map) => {
                match map.get("type").and_then(serde_json::Value::as_str) {
                    Some("function") => {
                        let name = map
                            .get("name")
                            .and_then(serde_json::Value::as_str)
                            .ok_or_else(|| D::Error::custom("tool_choice function missing name"))?;
                        Ok(ToolChoice::Function {
                            name: name.to_string(),
                        })
                    }
                    _ => Err(D::Error::custom("unknown tool_choice object shape")),
                }
            }
            _ => Err(D::Error::custom("tool_choice must be a string or object")),
        }
    }
}

// =============================================================================
// Max Tokens
// =============================================================================

/// Maximum response output tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(u32),
    /// Uncapped ("inf")
    Infinite(String),
}

impl MaxTokens {
    /// Uncapped output.
    pub fn infinite() -> Self {
        MaxTokens::Infinite("inf".to_string())
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// The negotiable session contract.
///
/// Mutated only via [`crate::session::RealtimeSession::update`] while
/// connected; the server's acknowledgement updates a separate read-only
/// mirror, never this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model identifier. Rides in the connection URL, never in a
    /// session.update payload.
    #[serde(skip)]
    pub model: String,

    /// Enabled response modalities
    pub modalities: Vec<Modality>,

    /// Voice for audio output
    pub voice: Voice,

    /// System instructions for the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Input audio format
    pub input_audio_format: AudioFormat,

    /// Output audio format
    pub output_audio_format: AudioFormat,

    /// Input audio transcription configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,

    /// Turn detection configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,

    /// Tool definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Tool choice strategy
    pub tool_choice: ToolChoice,

    /// Temperature for response generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum response output tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxTokens>,
}

impl SessionConfig {
    /// Create a configuration with documented defaults for the given model:
    /// PCM16 both directions, text+audio modalities, server VAD.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            modalities: vec![Modality::Text, Modality::Audio],
            voice: Voice::default(),
            instructions: None,
            input_audio_format: AudioFormat::default(),
            output_audio_format: AudioFormat::default(),
            input_audio_transcription: None,
            turn_detection: Some(TurnDetection::default()),
            tools: Vec::new(),
            tool_choice: ToolChoice::default(),
            temperature: None,
            max_response_output_tokens: None,
        }
    }

    /// Preset: spoken conversation. Server VAD on, text and audio output.
    pub fn voice_conversation(model: impl Into<String>) -> Self {
        Self::new(model)
    }

    /// Preset: typed conversation. VAD disabled, text output only.
    pub fn text_only(model: impl Into<String>) -> Self {
        Self {
            modalities: vec![Modality::Text],
            turn_detection: Some(TurnDetection::disabled()),
            ..Self::new(model)
        }
    }

    /// Preset: spoken conversation with callable tools, tool choice auto.
    pub fn with_tools(model: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            tools,
            tool_choice: ToolChoice::Auto,
            ..Self::new(model)
        }
    }

    /// Set system instructions.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the output voice.
    pub fn voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Whether this configuration differs from the defaults for its model,
    /// in which case connect() pushes one automatic session.update so the
    /// server mirrors intent before any other event.
    pub fn requires_update(&self) -> bool {
        *self != Self::new(self.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_voice_parsing() {
        assert_eq!(Voice::from_str_or_default("SHIMMER"), Voice::Shimmer);
        assert_eq!(Voice::from_str_or_default("unknown"), Voice::Alloy);
        assert_eq!(Voice::Verse.as_str(), "verse");
    }

    #[test]
    fn test_audio_format_sample_rate() {
        assert_eq!(AudioFormat::Pcm16.sample_rate(), 24000);
        assert_eq!(AudioFormat::G711Ulaw.sample_rate(), 8000);
        assert_eq!(AudioFormat::from_str_or_default("linear16"), AudioFormat::Pcm16);
    }

    #[test]
    fn test_turn_detection_defaults() {
        match TurnDetection::default() {
            TurnDetection::ServerVad {
                threshold,
                prefix_padding_ms,
                silence_duration_ms,
                create_response,
            } => {
                assert_eq!(threshold, Some(0.5));
                assert_eq!(prefix_padding_ms, Some(300));
                assert_eq!(silence_duration_ms, Some(200));
                assert_eq!(create_response, Some(true));
            }
            TurnDetection::None {} => panic!("expected server VAD default"),
        }
    }

    #[test]
    fn test_tool_choice_string_encoding() {
        assert_eq!(serde_json::to_string(&ToolChoice::Auto).unwrap(), "\"auto\"");
        assert_eq!(serde_json::to_string(&ToolChoice::None).unwrap(), "\"none\"");
        assert_eq!(
            serde_json::to_string(&ToolChoice::Required).unwrap(),
            "\"required\""
        );
    }

    #[test]
    fn test_tool_choice_function_encoding() {
        let choice = ToolChoice::Function {
            name: "get_weather".to_string(),
        };
        let value = serde_json::to_value(&choice).unwrap();
        assert_eq!(value, json!({"type": "function", "name": "get_weather"}));
    }

    #[test]
    fn test_tool_choice_decodes_both_shapes() {
        let auto: ToolChoice = serde_json::from_value(json!("auto")).unwrap();
        assert_eq!(auto, ToolChoice::Auto);

        let named: ToolChoice =
            serde_json::from_value(json!({"type": "function", "name": "lookup"})).unwrap();
        assert_eq!(
            named,
            ToolChoice::Function {
                name: "lookup".to_string()
            }
        );

        assert!(serde_json::from_value::<ToolChoice>(json!("sometimes")).is_err());
        assert!(serde_json::from_value::<ToolChoice>(json!({"type": "plugin"})).is_err());
        assert!(serde_json::from_value::<ToolChoice>(json!(42)).is_err());
    }

    #[test]
    fn test_default_config_needs_no_update() {
        let config = SessionConfig::new("gpt-4o-realtime-preview");
        assert!(!config.requires_update());
    }

    #[test]
    fn test_instructions_require_update() {
        let config =
            SessionConfig::new("gpt-4o-realtime-preview").instructions("You are terse.");
        assert!(config.requires_update());
    }

    #[test]
    fn test_presets() {
        let text = SessionConfig::text_only("m");
        assert_eq!(text.modalities, vec![Modality::Text]);
        assert_eq!(text.turn_detection, Some(TurnDetection::disabled()));

        let tools = vec![ToolDefinition::function(
            "get_weather",
            "Look up the weather",
            json!({"type": "object", "properties": {"city": {"type": "string"}}}),
        )];
        let with_tools = SessionConfig::with_tools("m", tools.clone());
        assert_eq!(with_tools.tools, tools);
        assert_eq!(with_tools.tool_choice, ToolChoice::Auto);
    }

    #[test]
    fn test_model_never_serialized() {
        let config = SessionConfig::new("gpt-4o-realtime-preview");
        let value = serde_json::to_value(&config).unwrap();
        assert!(value.get("model").is_none());
        assert_eq!(value["voice"], "alloy");
        assert_eq!(value["input_audio_format"], "pcm16");
    }

    #[test]
    fn test_max_tokens_wire_shapes() {
        assert_eq!(serde_json::to_string(&MaxTokens::Number(4096)).unwrap(), "4096");
        assert_eq!(serde_json::to_string(&MaxTokens::infinite()).unwrap(), "\"inf\"");
        let n: MaxTokens = serde_json::from_str("2048").unwrap();
        assert_eq!(n, MaxTokens::Number(2048));
        let inf: MaxTokens = serde_json::from_str("\"inf\"").unwrap();
        assert_eq!(inf, MaxTokens::infinite());
    }
}
