//! Session lifecycle management.
//!
//! The manager is the single source of truth for whether capture and
//! playback are active. It owns the one live [`LiveHandle`], supervises the
//! capture pipeline and playback scheduler, and derives the character state
//! consumed by the renderer.
//!
//! The live API has no in-band way to update instructions, so every context
//! change restarts the session: `stop(preserve_active = true)` followed
//! immediately by a fresh connect with the regenerated behavior script. All
//! mutating operations take `&mut self`, which serializes rapid repeated
//! context changes: a new start never begins before the previous teardown's
//! synchronous portion has completed, and no two sessions can race for the
//! capture device.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::audio::capture::{CaptureDevice, CapturePipeline, CaptureSource};
use crate::audio::codec::{AudioBuffer, OUTPUT_SAMPLE_RATE};
use crate::audio::playback::{NullSink, OutputClock, PlaybackScheduler, PlaybackSink, TokioClock};
use crate::character::{CharacterContext, Location, Theme, behavior_script};
use crate::error::VoiceResult;
use crate::live::{GeminiVoice, LiveHandle, LiveTransport, SessionConfig, SessionEvent};

use super::{CharacterState, SessionSnapshot};

/// How long the rotary phone rings before the character picks up.
const PHONE_RING_DURATION: Duration = Duration::from_secs(2);

/// Options for constructing a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Live model identifier
    pub model: String,
    /// Voice for synthesized speech
    pub voice: GeminiVoice,
    /// Initial character context
    pub context: CharacterContext,
}

/// One live session's supervised resources.
struct ActiveSession {
    id: Uuid,
    handle: LiveHandle,
    cancel: CancellationToken,
    scheduler: Arc<PlaybackScheduler>,
}

/// Supervises the capture pipeline, live transport and playback scheduler
/// for at most one session at a time.
pub struct SessionManager {
    transport: Arc<dyn LiveTransport>,
    capture: Arc<dyn CaptureDevice>,
    clock: Arc<dyn OutputClock>,
    sink: Arc<dyn PlaybackSink>,
    model: String,
    voice: GeminiVoice,
    context: CharacterContext,
    state_tx: Arc<watch::Sender<CharacterState>>,
    state_rx: watch::Receiver<CharacterState>,
    active: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn LiveTransport>,
        capture: Arc<dyn CaptureDevice>,
        options: SessionOptions,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(CharacterState::Idle);
        Self {
            transport,
            capture,
            clock: Arc::new(TokioClock::new()),
            sink: Arc::new(NullSink),
            model: options.model,
            voice: options.voice,
            context: options.context,
            state_tx: Arc::new(state_tx),
            state_rx,
            active: None,
        }
    }

    /// Replace the output clock (used by tests and device integrations).
    pub fn with_clock(mut self, clock: Arc<dyn OutputClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the playback sink.
    pub fn with_sink(mut self, sink: Arc<dyn PlaybackSink>) -> Self {
        self.sink = sink;
        self
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start a session with the current voice and context.
    ///
    /// Any previous session is fully torn down first; exactly one handle is
    /// ever live. Capture is acquired before connecting; if the microphone
    /// is unavailable the session never starts. On the transport's open
    /// event the capture pipeline is wired and the state flips to Listening.
    pub async fn start(&mut self) -> VoiceResult<()> {
        let was_active = self.active.is_some();
        self.stop(was_active);

        let source = match self.capture.acquire() {
            Ok(source) => source,
            Err(e) => {
                tracing::error!("microphone acquisition failed: {e}");
                let _ = self.state_tx.send(CharacterState::Idle);
                return Err(e);
            }
        };

        let config = SessionConfig {
            model: self.model.clone(),
            voice: self.voice,
            system_instruction: behavior_script(&self.context),
        };
        let (handle, events) = match self.transport.connect(config).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::error!("session connect failed: {e}");
                let _ = self.state_tx.send(CharacterState::Idle);
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let (drained_tx, drained_rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(PlaybackScheduler::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.sink),
            drained_tx,
        ));

        let id = Uuid::new_v4();
        tokio::spawn(run_event_loop(EventLoop {
            events,
            drained_rx,
            handle: handle.clone(),
            source: Some(source),
            scheduler: Arc::clone(&scheduler),
            state_tx: Arc::clone(&self.state_tx),
            cancel: cancel.clone(),
        }));

        self.active = Some(ActiveSession {
            id,
            handle,
            cancel,
            scheduler,
        });
        tracing::info!(session = %id, voice = %self.voice, "session started");
        Ok(())
    }

    /// Stop the current session, if any.
    ///
    /// Closes the handle (the socket shutdown itself is asynchronous),
    /// disconnects the capture wiring and force-stops all active playback.
    /// With `preserve_active` the observable state is left for an imminent
    /// `start` to re-open, so a restart never flashes the inactive UI.
    pub fn stop(&mut self, preserve_active: bool) {
        if let Some(active) = self.active.take() {
            active.handle.close();
            active.cancel.cancel();
            active.scheduler.stop_all();
            tracing::info!(session = %active.id, "session stopped");
        }
        if !preserve_active {
            let _ = self.state_tx.send(CharacterState::Idle);
        }
    }

    /// Whether a session is currently live.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_closed())
    }

    // -------------------------------------------------------------------------
    // Observability
    // -------------------------------------------------------------------------

    /// Current character state.
    pub fn state(&self) -> CharacterState {
        *self.state_rx.borrow()
    }

    /// Subscribe to character state changes.
    pub fn subscribe(&self) -> watch::Receiver<CharacterState> {
        self.state_tx.subscribe()
    }

    /// Read-only snapshot for the renderer; all zeros when inactive.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mouth_openness = match (&self.active, self.state()) {
            (Some(active), CharacterState::Speaking) => active.scheduler.output_level(),
            _ => 0.0,
        };
        SessionSnapshot {
            state: self.state(),
            mouth_openness,
        }
    }

    /// Current context snapshot.
    pub fn context(&self) -> CharacterContext {
        self.context
    }

    /// Configured voice.
    pub fn voice(&self) -> GeminiVoice {
        self.voice
    }

    // -------------------------------------------------------------------------
    // Context operations (restart-to-update-context)
    // -------------------------------------------------------------------------

    /// Poke the character: it gets surprised.
    pub async fn poke(&mut self) -> VoiceResult<()> {
        self.apply_context(self.context.poked()).await
    }

    /// Hug the character.
    pub async fn hug(&mut self) -> VoiceResult<()> {
        self.apply_context(self.context.hugged()).await
    }

    /// Tickle the character into a giggle.
    pub async fn giggle(&mut self) -> VoiceResult<()> {
        self.apply_context(self.context.giggled()).await
    }

    /// Put the character down for a nap.
    pub async fn nap(&mut self) -> VoiceResult<()> {
        self.apply_context(self.context.napped()).await
    }

    /// Ring the rotary phone; after a short ring the character answers and
    /// the session restarts with the phone-call script.
    pub async fn call_phone(&mut self) -> VoiceResult<()> {
        if self.context.phone_ringing || self.context.phone_active {
            return Ok(());
        }
        self.context = self.context.phone_ringing();
        tokio::time::sleep(PHONE_RING_DURATION).await;
        self.apply_context(self.context.phone_answered()).await
    }

    /// Put the receiver back on the hook.
    pub async fn hang_up(&mut self) -> VoiceResult<()> {
        self.apply_context(self.context.hung_up()).await
    }

    /// Move the character to another room.
    pub async fn switch_location(&mut self, location: Location) -> VoiceResult<()> {
        self.apply_context(self.context.moved_to(location)).await
    }

    /// Change the scenery theme. Scenery never reaches the model, so no
    /// restart is needed.
    pub fn set_theme(&mut self, theme: Theme) {
        self.context = self.context.themed(theme);
    }

    /// Switch the voice; restarts the session when one is active.
    pub async fn set_voice(&mut self, voice: GeminiVoice) -> VoiceResult<()> {
        self.voice = voice;
        if self.is_active() { self.start().await } else { Ok(()) }
    }

    /// Adopt a new context snapshot; when a session is active this is a
    /// seamless stop(preserve) + start with the regenerated script.
    async fn apply_context(&mut self, next: CharacterContext) -> VoiceResult<()> {
        self.context = next;
        if self.is_active() { self.start().await } else { Ok(()) }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop(false);
    }
}

// =============================================================================
// Event loop
// =============================================================================

struct EventLoop {
    events: mpsc::Receiver<SessionEvent>,
    drained_rx: mpsc::UnboundedReceiver<()>,
    handle: LiveHandle,
    source: Option<Box<dyn CaptureSource>>,
    scheduler: Arc<PlaybackScheduler>,
    state_tx: Arc<watch::Sender<CharacterState>>,
    cancel: CancellationToken,
}

/// Single consumer of the session's tagged event channel.
///
/// All pipeline mutation happens here, in event-arrival order: opening wires
/// the capture pipeline, fragments are decoded and scheduled, a drained
/// playback set flips Speaking back to Listening, and a transport error
/// tears everything down to Idle.
async fn run_event_loop(mut ctx: EventLoop) {
    loop {
        tokio::select! {
            // Cancellation must win over queued events, so a torn-down loop
            // can never touch the state channel the next session shares.
            biased;

            _ = ctx.cancel.cancelled() => break,

            Some(()) = ctx.drained_rx.recv() => {
                // The signal may be stale: a fragment processed after it was
                // queued can have refilled the active set.
                if !ctx.scheduler.is_speaking()
                    && *ctx.state_tx.borrow() == CharacterState::Speaking
                {
                    let _ = ctx.state_tx.send(CharacterState::Listening);
                }
            }

            event = ctx.events.recv() => match event {
                Some(SessionEvent::Opened) => {
                    let _ = ctx.state_tx.send(CharacterState::Listening);
                    // Wired only now, so pre-open capture frames cannot exist.
                    if let Some(source) = ctx.source.take() {
                        CapturePipeline::spawn(
                            source,
                            ctx.handle.clone(),
                            ctx.cancel.child_token(),
                        );
                    }
                }

                Some(SessionEvent::Fragment(raw)) => {
                    match AudioBuffer::from_pcm16(&raw, OUTPUT_SAMPLE_RATE) {
                        Ok(buffer) => {
                            ctx.scheduler.schedule(buffer);
                            let _ = ctx.state_tx.send(CharacterState::Speaking);
                        }
                        Err(e) => {
                            // Skipped entirely; never played as silence or noise.
                            tracing::warn!("dropping undecodable fragment: {e}");
                        }
                    }
                }

                Some(SessionEvent::Transcript { text, is_final }) => {
                    tracing::debug!(is_final, "transcript: {text}");
                }

                Some(SessionEvent::Error(reason)) => {
                    tracing::error!("session transport error: {reason}");
                    ctx.handle.close();
                    ctx.scheduler.stop_all();
                    if !ctx.cancel.is_cancelled() {
                        let _ = ctx.state_tx.send(CharacterState::Idle);
                    }
                    break;
                }

                Some(SessionEvent::Closed) => {
                    tracing::info!("session closed by remote");
                    ctx.handle.close();
                    ctx.scheduler.stop_all();
                    if !ctx.cancel.is_cancelled() {
                        let _ = ctx.state_tx.send(CharacterState::Idle);
                    }
                    break;
                }

                None => break,
            }
        }
    }
    tracing::debug!("session event loop ended");
}
