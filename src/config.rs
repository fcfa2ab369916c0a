//! Application configuration.
//!
//! Configuration priority: actual environment variables override `.env`
//! values. The `.env` file is loaded in main.rs at application startup.

use crate::character::Location;
use crate::error::{VoiceError, VoiceResult};
use crate::live::gemini::{DEFAULT_LIVE_MODEL, GeminiVoice};

/// Runtime configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Gemini API key (required)
    pub api_key: String,
    /// Live model identifier
    pub model: String,
    /// Voice for synthesized speech
    pub voice: GeminiVoice,
    /// Starting room for the character
    pub location: Location,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment variables
    /// * `GEMINI_API_KEY` - required
    /// * `GRANDPA_MODEL` - optional, defaults to the native-audio live model
    /// * `GRANDPA_VOICE` - optional, one of the prebuilt voices
    /// * `GRANDPA_LOCATION` - optional, starting room
    pub fn from_env() -> VoiceResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            VoiceError::InvalidConfiguration(
                "GEMINI_API_KEY environment variable is not set".to_string(),
            )
        })?;
        if api_key.trim().is_empty() {
            return Err(VoiceError::InvalidConfiguration(
                "GEMINI_API_KEY is empty".to_string(),
            ));
        }

        let model =
            std::env::var("GRANDPA_MODEL").unwrap_or_else(|_| DEFAULT_LIVE_MODEL.to_string());
        let voice = std::env::var("GRANDPA_VOICE")
            .map(|v| GeminiVoice::from_str_or_default(&v))
            .unwrap_or_default();
        let location = std::env::var("GRANDPA_LOCATION")
            .map(|l| Location::from_str_or_default(&l))
            .unwrap_or_default();

        Ok(Self {
            api_key,
            model,
            voice,
            location,
        })
    }
}
