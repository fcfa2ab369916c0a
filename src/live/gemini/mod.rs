//! Gemini Live API transport implementation.

mod client;
mod config;
pub mod messages;

pub use client::GeminiLive;
pub use config::{DEFAULT_LIVE_MODEL, GEMINI_LIVE_URL, GeminiVoice};
