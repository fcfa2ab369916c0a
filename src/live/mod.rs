//! Live speech-session transport.
//!
//! The remote speech-to-speech model is an external collaborator. A
//! [`LiveTransport`] opens one session and hands back a [`LiveHandle`] for
//! outbound audio plus a tagged event channel ([`SessionEvent`]) consumed by
//! the session manager's single event loop: connection state, inbound audio
//! and errors all arrive in order on that one channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audio::codec::AudioChunk;
use crate::error::{VoiceError, VoiceResult};

pub mod gemini;

pub use gemini::{DEFAULT_LIVE_MODEL, GEMINI_LIVE_URL, GeminiLive, GeminiVoice};

/// Events emitted by a live session, in arrival order.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Session is open and ready for realtime input
    Opened,
    /// One inbound unit of synthesized audio (raw 16-bit LE PCM at 24 kHz)
    Fragment(Bytes),
    /// Transcript of user or model speech
    Transcript { text: String, is_final: bool },
    /// Transport-level failure; the session is unusable afterwards
    Error(String),
    /// Session closed by the remote end
    Closed,
}

/// Configuration for opening a live session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Model identifier
    pub model: String,
    /// Prebuilt voice name
    pub voice: GeminiVoice,
    /// Generated behavior script sent as the system instruction
    pub system_instruction: String,
}

/// Opens live sessions against the speech model.
#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Connect and return the session handle plus its event stream.
    async fn connect(
        &self,
        config: SessionConfig,
    ) -> VoiceResult<(LiveHandle, mpsc::Receiver<SessionEvent>)>;
}

/// Handle to one live session.
///
/// Exactly one handle is live at a time; the lifecycle manager closes (and
/// drops) it before a new one is created. `close` is idempotent and takes
/// effect synchronously from the caller's perspective: `is_closed` flips
/// immediately while the underlying socket shutdown proceeds asynchronously.
#[derive(Clone)]
pub struct LiveHandle {
    input: mpsc::Sender<AudioChunk>,
    cancel: CancellationToken,
    closed: Arc<AtomicBool>,
}

impl LiveHandle {
    pub fn new(input: mpsc::Sender<AudioChunk>, cancel: CancellationToken) -> Self {
        Self {
            input,
            cancel,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Hand one captured chunk to the session, fire-and-forget.
    ///
    /// No acknowledgment is awaited; a full queue or a closing session turns
    /// into a [`VoiceError::Send`] the caller is free to drop.
    pub fn send_realtime_input(&self, chunk: AudioChunk) -> VoiceResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(VoiceError::NotConnected);
        }
        self.input
            .try_send(chunk)
            .map_err(|e| VoiceError::Send(e.to_string()))
    }

    /// Close the session. Issuing close does not block further calls.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
