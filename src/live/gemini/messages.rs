//! Gemini Live API (`BidiGenerateContent`) WebSocket message types.
//!
//! All messages are JSON-encoded with camelCase field names.
//!
//! Client messages (sent to server):
//! - `setup` - model, generation config, system instruction
//! - `realtimeInput` - streamed microphone audio chunks
//!
//! Server messages (received from server):
//! - `setupComplete` - session is open
//! - `serverContent.modelTurn` - parts carrying inline base64 audio
//! - `serverContent.turnComplete` / `interrupted` - turn boundaries
//! - `serverContent.inputTranscription` - user speech transcript

use serde::{Deserialize, Serialize};

use crate::audio::codec::AudioChunk;

// =============================================================================
// Client messages
// =============================================================================

/// Top-level client message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Session setup, sent exactly once after the socket opens.
    Setup(SetupConfig),
    /// Streamed realtime media input.
    RealtimeInput(RealtimeInput),
}

/// Session setup payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    /// Empty object enables transcription of user speech.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Realtime media input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// One base64-encoded media chunk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

impl ClientMessage {
    /// Wrap one captured audio chunk as a realtime input message.
    pub fn realtime_audio(chunk: AudioChunk) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![MediaChunk {
                mime_type: chunk.mime_type,
                data: chunk.data,
            }],
        })
    }
}

// =============================================================================
// Server messages
// =============================================================================

/// Top-level server message. Fields are optional; a message carries zero or
/// one audio fragment (absence means a control-only turn).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub interrupted: Option<bool>,
    #[serde(default)]
    pub input_transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcription {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub finished: Option<bool>,
}

/// Model content: a list of parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.into()),
                inline_data: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    pub data: String,
}

impl ServerMessage {
    /// Base64 audio payload of this message's model turn, if any.
    pub fn audio_fragment(&self) -> Option<&str> {
        self.server_content
            .as_ref()?
            .model_turn
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.inline_data.as_ref())
            .map(|inline| inline.data.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_serializes_camel_case() {
        let setup = ClientMessage::Setup(SetupConfig {
            model: "models/test".to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Puck".to_string(),
                        },
                    },
                }),
            },
            system_instruction: Some(Content::from_text("Act as a grandpa.")),
            input_audio_transcription: Some(serde_json::json!({})),
        });

        let json = serde_json::to_value(&setup).unwrap();
        assert_eq!(json["setup"]["model"], "models/test");
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
        assert_eq!(
            json["setup"]["systemInstruction"]["parts"][0]["text"],
            "Act as a grandpa."
        );
    }

    #[test]
    fn test_realtime_input_carries_chunk() {
        let chunk = AudioChunk::from_samples(&[0.25; 32]);
        let expected = chunk.data.clone();
        let json = serde_json::to_value(ClientMessage::realtime_audio(chunk)).unwrap();
        assert_eq!(
            json["realtimeInput"]["mediaChunks"][0]["mimeType"],
            "audio/pcm;rate=16000"
        );
        assert_eq!(json["realtimeInput"]["mediaChunks"][0]["data"], expected);
    }

    #[test]
    fn test_audio_fragment_extraction() {
        let msg: ServerMessage = serde_json::from_str(
            r#"{
                "serverContent": {
                    "modelTurn": {
                        "parts": [
                            {"text": "ho ho"},
                            {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}}
                        ]
                    }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(msg.audio_fragment(), Some("AAAA"));
    }

    #[test]
    fn test_control_only_message_has_no_fragment() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"serverContent": {"turnComplete": true}}"#).unwrap();
        assert_eq!(msg.audio_fragment(), None);
        assert_eq!(msg.server_content.unwrap().turn_complete, Some(true));
    }

    #[test]
    fn test_setup_complete_parses() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
    }
}
