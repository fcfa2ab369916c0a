//! Mock collaborators for session lifecycle tests.
//!
//! `MockLive` records every connect (the generated behavior script, the
//! requested voice, the handle given out) and hands the test an event sender
//! so it can drive the session: open it, feed synthesized audio fragments,
//! or fail it. `ScriptedCaptureDevice` plays a fixed set of frames as the
//! microphone without real-time pacing.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use talking_grandpa::audio::capture::{CaptureDevice, CaptureSource};
use talking_grandpa::audio::codec::AudioChunk;
use talking_grandpa::error::{VoiceError, VoiceResult};
use talking_grandpa::live::{GeminiVoice, LiveHandle, LiveTransport, SessionConfig, SessionEvent};

/// One recorded session opened through [`MockLive`].
pub struct MockSession {
    pub system_instruction: String,
    pub voice: GeminiVoice,
    pub handle: LiveHandle,
    events: mpsc::Sender<SessionEvent>,
    input: Mutex<Option<mpsc::Receiver<AudioChunk>>>,
}

impl MockSession {
    /// Signal the session is open and ready.
    pub async fn open(&self) {
        self.events.send(SessionEvent::Opened).await.unwrap();
    }

    /// Deliver one synthesized audio fragment (raw 16-bit LE PCM bytes).
    pub async fn send_fragment(&self, raw: Bytes) {
        self.events.send(SessionEvent::Fragment(raw)).await.unwrap();
    }

    /// Deliver a transport failure.
    pub async fn send_error(&self, reason: &str) {
        self.events
            .send(SessionEvent::Error(reason.to_string()))
            .await
            .unwrap();
    }

    /// Signal a remote close.
    pub async fn send_closed(&self) {
        self.events.send(SessionEvent::Closed).await.unwrap();
    }

    /// Take the receiving end of the session's audio input queue.
    pub fn take_input(&self) -> mpsc::Receiver<AudioChunk> {
        self.input.lock().take().expect("input already taken")
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

/// Transport double that records connects and lets tests drive sessions.
#[derive(Default)]
pub struct MockLive {
    sessions: Mutex<Vec<Arc<MockSession>>>,
    fail_next: AtomicBool,
}

impl MockLive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next connect attempt fail.
    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn session(&self, index: usize) -> Arc<MockSession> {
        Arc::clone(&self.sessions.lock()[index])
    }

    pub fn last_session(&self) -> Arc<MockSession> {
        Arc::clone(self.sessions.lock().last().expect("no sessions opened"))
    }
}

#[async_trait]
impl LiveTransport for MockLive {
    async fn connect(
        &self,
        config: SessionConfig,
    ) -> VoiceResult<(LiveHandle, mpsc::Receiver<SessionEvent>)> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(VoiceError::Transport("mock connect refused".to_string()));
        }
        let (input_tx, input_rx) = mpsc::channel(256);
        let (event_tx, event_rx) = mpsc::channel(256);
        let handle = LiveHandle::new(input_tx, CancellationToken::new());
        self.sessions.lock().push(Arc::new(MockSession {
            system_instruction: config.system_instruction,
            voice: config.voice,
            handle: handle.clone(),
            events: event_tx,
            input: Mutex::new(Some(input_rx)),
        }));
        Ok((handle, event_rx))
    }
}

/// Capture source replaying a fixed frame list, no pacing.
pub struct ScriptedSource {
    frames: std::vec::IntoIter<Vec<f32>>,
}

#[async_trait]
impl CaptureSource for ScriptedSource {
    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        match self.frames.next() {
            Some(frame) => Some(frame),
            None => {
                // Keep the pipeline alive without busy-looping once the
                // script runs out.
                std::future::pending::<Option<Vec<f32>>>().await
            }
        }
    }
}

/// Capture device handing out [`ScriptedSource`] streams.
pub struct ScriptedCaptureDevice {
    frames: Vec<Vec<f32>>,
    fail: AtomicBool,
}

impl ScriptedCaptureDevice {
    pub fn new(frames: Vec<Vec<f32>>) -> Arc<Self> {
        Arc::new(Self {
            frames,
            fail: AtomicBool::new(false),
        })
    }

    /// Quiet microphone with nothing to say.
    pub fn silent() -> Arc<Self> {
        Self::new(Vec::new())
    }

    /// Make every subsequent acquire fail, as a revoked permission would.
    pub fn deny(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl CaptureDevice for ScriptedCaptureDevice {
    fn acquire(&self) -> VoiceResult<Box<dyn CaptureSource>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Acquisition(
                "microphone permission denied".to_string(),
            ));
        }
        Ok(Box::new(ScriptedSource {
            frames: self.frames.clone().into_iter(),
        }))
    }
}

/// Raw 16-bit LE PCM bytes for `sample_count` samples of a quiet ramp.
pub fn pcm_fragment(sample_count: usize) -> Bytes {
    let mut raw = Vec::with_capacity(sample_count * 2);
    for i in 0..sample_count {
        let value = ((i % 64) as i16 - 32) * 256;
        raw.extend_from_slice(&value.to_le_bytes());
    }
    Bytes::from(raw)
}
