//! Gemini Live API client.
//!
//! Opens one `BidiGenerateContent` WebSocket session per connect call. The
//! socket task owns both directions: captured audio chunks arrive on an mpsc
//! channel and go out as `realtimeInput` messages; server messages are parsed
//! and forwarded as [`SessionEvent`]s in arrival order.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::GEMINI_LIVE_URL;
use super::messages::{
    ClientMessage, Content, GenerationConfig, PrebuiltVoiceConfig, ServerMessage, SetupConfig,
    SpeechConfig, VoiceConfig,
};
use crate::audio::codec::decode_base64;
use crate::error::{VoiceError, VoiceResult};
use crate::live::{LiveHandle, LiveTransport, SessionConfig, SessionEvent};

/// Channel capacity for outbound audio chunks.
const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Gemini Live API transport.
pub struct GeminiLive {
    api_key: String,
}

impl GeminiLive {
    pub fn new(api_key: impl Into<String>) -> VoiceResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(VoiceError::InvalidConfiguration(
                "API key is required".to_string(),
            ));
        }
        Ok(Self { api_key })
    }

    fn build_ws_url(&self) -> VoiceResult<Url> {
        Url::parse_with_params(GEMINI_LIVE_URL, &[("key", self.api_key.as_str())])
            .map_err(|e| VoiceError::InvalidConfiguration(e.to_string()))
    }

    fn build_setup(config: &SessionConfig) -> ClientMessage {
        ClientMessage::Setup(SetupConfig {
            model: config.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: config.voice.as_str().to_string(),
                        },
                    },
                }),
            },
            system_instruction: Some(Content::from_text(config.system_instruction.clone())),
            input_audio_transcription: Some(serde_json::json!({})),
        })
    }

    /// Forward one parsed server message to the event channel.
    async fn handle_server_message(msg: ServerMessage, events: &mpsc::Sender<SessionEvent>) {
        if msg.setup_complete.is_some() {
            tracing::info!("Gemini Live session open");
            let _ = events.send(SessionEvent::Opened).await;
            return;
        }

        let Some(content) = msg.server_content else {
            tracing::trace!("unhandled server message");
            return;
        };

        if let Some(transcription) = content.input_transcription
            && let Some(text) = transcription.text
        {
            let _ = events
                .send(SessionEvent::Transcript {
                    text,
                    is_final: transcription.finished.unwrap_or(false),
                })
                .await;
        }

        if let Some(turn) = content.model_turn {
            for part in &turn.parts {
                let Some(inline) = part.inline_data.as_ref() else {
                    continue;
                };
                match decode_base64(&inline.data) {
                    Ok(raw) => {
                        let _ = events.send(SessionEvent::Fragment(raw)).await;
                    }
                    Err(e) => {
                        // Malformed fragment: drop it, the session stays up.
                        tracing::warn!("dropping undecodable audio fragment: {e}");
                    }
                }
            }
        }

        if content.interrupted == Some(true) {
            tracing::debug!("model turn interrupted");
        }
    }
}

#[async_trait]
impl LiveTransport for GeminiLive {
    async fn connect(
        &self,
        config: SessionConfig,
    ) -> VoiceResult<(LiveHandle, mpsc::Receiver<SessionEvent>)> {
        let url = self.build_ws_url()?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;
        tracing::info!(model = %config.model, voice = %config.voice, "connected to Gemini Live API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        // Setup must be the first frame on the socket.
        let setup = serde_json::to_string(&Self::build_setup(&config))
            .map_err(|e| VoiceError::Serialization(e.to_string()))?;
        ws_sink
            .send(Message::Text(setup.into()))
            .await
            .map_err(|e| VoiceError::Transport(e.to_string()))?;

        let (input_tx, mut input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let handle = LiveHandle::new(input_tx, cancel.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }

                    Some(chunk) = input_rx.recv() => {
                        let json = match serde_json::to_string(&ClientMessage::realtime_audio(chunk)) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("failed to serialize realtime input: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("failed to send realtime input: {e}");
                            let _ = event_tx.send(SessionEvent::Error(e.to_string())).await;
                            break;
                        }
                    }

                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerMessage>(&text) {
                                    Ok(parsed) => Self::handle_server_message(parsed, &event_tx).await,
                                    Err(e) => tracing::warn!("failed to parse server message: {e}"),
                                }
                            }
                            Some(Ok(Message::Binary(data))) => {
                                // The live API may frame JSON as binary.
                                match serde_json::from_slice::<ServerMessage>(&data) {
                                    Ok(parsed) => Self::handle_server_message(parsed, &event_tx).await,
                                    Err(e) => tracing::warn!("failed to parse server message: {e}"),
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("failed to send pong: {e}");
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                tracing::info!("Gemini Live session closed by server");
                                let _ = event_tx.send(SessionEvent::Closed).await;
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {e}");
                                let _ = event_tx.send(SessionEvent::Error(e.to_string())).await;
                                break;
                            }
                            None => {
                                let _ = event_tx.send(SessionEvent::Closed).await;
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }
            tracing::debug!("Gemini Live socket task ended");
        });

        Ok((handle, event_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::GeminiVoice;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(
            GeminiLive::new(""),
            Err(VoiceError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_ws_url_carries_key() {
        let client = GeminiLive::new("test-key").unwrap();
        let url = client.build_ws_url().unwrap();
        assert!(url.as_str().starts_with("wss://generativelanguage.googleapis.com"));
        assert_eq!(url.query(), Some("key=test-key"));
    }

    #[test]
    fn test_setup_message_reflects_session_config() {
        let config = SessionConfig {
            model: "models/demo".to_string(),
            voice: GeminiVoice::Kore,
            system_instruction: "Repeat after me.".to_string(),
        };
        let json = serde_json::to_value(GeminiLive::build_setup(&config)).unwrap();
        assert_eq!(json["setup"]["model"], "models/demo");
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Kore"
        );
        assert_eq!(
            json["setup"]["systemInstruction"]["parts"][0]["text"],
            "Repeat after me."
        );
    }
}
