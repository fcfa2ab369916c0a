//! Gemini Live API configuration types.

use serde::{Deserialize, Serialize};

/// Gemini Live API WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default live model.
pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Prebuilt voices available on the live API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeminiVoice {
    /// Puck voice (default)
    #[default]
    Puck,
    /// Charon voice
    Charon,
    /// Kore voice
    Kore,
    /// Fenrir voice
    Fenrir,
    /// Zephyr voice
    Zephyr,
}

impl GeminiVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Puck => "Puck",
            Self::Charon => "Charon",
            Self::Kore => "Kore",
            Self::Fenrir => "Fenrir",
            Self::Zephyr => "Zephyr",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "puck" => Self::Puck,
            "charon" => Self::Charon,
            "kore" => Self::Kore,
            "fenrir" => Self::Fenrir,
            "zephyr" => Self::Zephyr,
            _ => Self::default(),
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [GeminiVoice] {
        &[
            Self::Puck,
            Self::Charon,
            Self::Kore,
            Self::Fenrir,
            Self::Zephyr,
        ]
    }
}

impl std::fmt::Display for GeminiVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
