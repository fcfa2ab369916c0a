pub mod audio;
pub mod character;
pub mod config;
pub mod error;
pub mod live;
pub mod session;

// Re-export commonly used items for convenience
pub use audio::codec::{AudioBuffer, AudioChunk, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};
pub use character::{CharacterContext, Location, Mood, Theme, behavior_script};
pub use config::AppConfig;
pub use error::{VoiceError, VoiceResult};
pub use live::gemini::{GeminiLive, GeminiVoice};
pub use session::{CharacterState, SessionManager, SessionOptions, SessionSnapshot};
