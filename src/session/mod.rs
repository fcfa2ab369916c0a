//! Session lifecycle and character state.

mod manager;

use serde::{Deserialize, Serialize};

pub use manager::{SessionManager, SessionOptions};

/// What the character is doing right now, as the renderer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterState {
    /// No session; the character sits quietly.
    #[default]
    Idle,
    /// Session open, microphone live, nothing playing.
    Listening,
    /// At least one response buffer is playing.
    Speaking,
    /// Reserved for renderer-level fault display; the manager itself
    /// resolves failures back to `Idle`.
    Error,
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub state: CharacterState,
    /// Smoothed output level in `[0.0, 1.0]`, zero when not speaking.
    pub mouth_openness: f32,
}
