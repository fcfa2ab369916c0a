//! Error types for the voice pipeline.
//!
//! Every failure is handled at the boundary where it occurs: microphone and
//! transport failures abort or tear down the session, decode failures drop
//! the offending fragment, and send failures are best-effort. Nothing
//! propagates past the session manager except through `VoiceResult` on the
//! start/stop entry points and the observable character state.

use thiserror::Error;

/// Errors that can occur in the voice pipeline.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Microphone acquisition failed (denied or unavailable)
    #[error("Microphone unavailable: {0}")]
    Acquisition(String),

    /// The live session transport failed
    #[error("Transport failure: {0}")]
    Transport(String),

    /// An inbound audio fragment could not be decoded
    #[error("Audio decode failed: {0}")]
    Decode(String),

    /// An outbound audio chunk could not be handed to the session
    #[error("Send failed: {0}")]
    Send(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No live session
    #[error("Not connected")]
    NotConnected,
}

/// Result type for voice pipeline operations.
pub type VoiceResult<T> = Result<T, VoiceError>;
