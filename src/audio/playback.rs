//! Gapless playback scheduling.
//!
//! Server audio arrives as discrete fragments with arbitrary jitter; the
//! scheduler lines them up back-to-back on the output clock using a single
//! monotonic "next free start time" cursor. Fragments are played strictly in
//! arrival order: there are no sequence numbers, so arrival order is assumed
//! to equal intended playback order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::codec::AudioBuffer;

/// Monotonic clock of the output device.
pub trait OutputClock: Send + Sync {
    /// Current time in seconds.
    fn now(&self) -> f64;
}

/// Clock backed by the tokio runtime.
///
/// Time zero is the moment of construction. Under a paused test runtime this
/// follows `tokio::time::advance`.
pub struct TokioClock {
    epoch: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            epoch: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputClock for TokioClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Output device hook that begins playback of a buffer at a scheduled time.
///
/// The real speaker path lives outside this crate; integrators implement this
/// against their audio device. [`NullSink`] discards the audio.
pub trait PlaybackSink: Send + Sync {
    fn play(&self, buffer: &AudioBuffer, start: f64);
}

/// Sink that discards audio. Used by tests and the demo binary.
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn play(&self, _buffer: &AudioBuffer, _start: f64) {}
}

/// An in-flight scheduled playback.
struct ActivePlayback {
    start: f64,
    duration: f64,
    buffer: AudioBuffer,
    completion: JoinHandle<()>,
}

/// Schedules inbound fragments for gapless sequential playback.
///
/// One scheduler exists per live session; it is created on session start and
/// discarded wholesale on stop, so the cursor never leaks across sessions.
pub struct PlaybackScheduler {
    clock: Arc<dyn OutputClock>,
    sink: Arc<dyn PlaybackSink>,
    cursor: Mutex<f64>,
    active: Arc<Mutex<HashMap<u64, ActivePlayback>>>,
    next_id: AtomicU64,
    drained_tx: mpsc::UnboundedSender<()>,
}

impl PlaybackScheduler {
    /// Create a scheduler. `drained_tx` fires whenever the active set
    /// transitions to empty; the lifecycle manager uses it to flip the
    /// character back from Speaking to Listening.
    pub fn new(
        clock: Arc<dyn OutputClock>,
        sink: Arc<dyn PlaybackSink>,
        drained_tx: mpsc::UnboundedSender<()>,
    ) -> Self {
        Self {
            clock,
            sink,
            cursor: Mutex::new(0.0),
            active: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
            drained_tx,
        }
    }

    /// Schedule a fragment at the next free slot and return its start time.
    ///
    /// The cursor first catches up to the clock (`cursor = max(cursor, now)`)
    /// so that a cursor left behind by an inactivity gap cannot schedule
    /// bursts in the past, then advances by the fragment's duration.
    pub fn schedule(&self, buffer: AudioBuffer) -> f64 {
        let now = self.clock.now();
        let duration = buffer.duration();

        let start = {
            let mut cursor = self.cursor.lock();
            let start = cursor.max(now);
            *cursor = start + duration;
            start
        };

        self.sink.play(&buffer, start);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = (start + duration - now).max(0.0);

        // Register the handle before its completion can fire.
        let mut active = self.active.lock();
        let active_ref = Arc::clone(&self.active);
        let drained_tx = self.drained_tx.clone();
        let completion = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            let emptied = {
                let mut active = active_ref.lock();
                active.remove(&id);
                active.is_empty()
            };
            if emptied {
                let _ = drained_tx.send(());
            }
        });
        active.insert(
            id,
            ActivePlayback {
                start,
                duration,
                buffer,
                completion,
            },
        );
        drop(active);

        tracing::debug!(start, duration, "scheduled playback fragment");
        start
    }

    /// Force-stop every in-flight playback and clear the active set.
    ///
    /// Handles are not allowed to finish naturally and no drained signal is
    /// emitted. The cursor is left as-is; the next session creates a fresh
    /// scheduler anyway.
    pub fn stop_all(&self) {
        let mut active = self.active.lock();
        for (_, playback) in active.drain() {
            playback.completion.abort();
        }
        tracing::debug!("force-stopped all active playback");
    }

    /// Number of in-flight scheduled playbacks.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Whether any fragment is currently scheduled or playing.
    pub fn is_speaking(&self) -> bool {
        self.active_count() > 0
    }

    /// Next free start time on the output clock.
    pub fn cursor(&self) -> f64 {
        *self.cursor.lock()
    }

    /// Signal-strength probe over the buffer currently under the play head,
    /// mapped to a mouth-openness value in `[0, 1]`.
    ///
    /// Sampled by the renderer on its own cadence; returns 0 when nothing is
    /// playing right now. Values below 0.1 are gated to 0 so a near-silent
    /// tail does not leave the mouth ajar.
    pub fn output_level(&self) -> f32 {
        let now = self.clock.now();
        let active = self.active.lock();
        for playback in active.values() {
            if now < playback.start || now >= playback.start + playback.duration {
                continue;
            }
            let rate = playback.buffer.sample_rate as f64;
            let offset = ((now - playback.start) * rate) as usize;
            let window = &playback.buffer.samples
                [offset..(offset + 512).min(playback.buffer.samples.len())];
            if window.is_empty() {
                continue;
            }
            let mean: f32 =
                window.iter().map(|s| s.abs()).sum::<f32>() / window.len() as f32;
            let level = (mean * 8.0).min(1.0);
            return if level > 0.1 { level } else { 0.0 };
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::OUTPUT_SAMPLE_RATE;

    fn buffer_of(duration_secs: f64, amplitude: f32) -> AudioBuffer {
        let samples = (duration_secs * OUTPUT_SAMPLE_RATE as f64) as usize;
        AudioBuffer {
            samples: vec![amplitude; samples],
            sample_rate: OUTPUT_SAMPLE_RATE,
            channels: 1,
        }
    }

    fn scheduler() -> (Arc<PlaybackScheduler>, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(PlaybackScheduler::new(
            Arc::new(TokioClock::new()),
            Arc::new(NullSink),
            tx,
        ));
        (scheduler, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_gapless_schedule_with_catch_up() {
        let (scheduler, _rx) = scheduler();

        // Fragments of 0.5s, 0.3s, 0.7s arriving at t=0, t=0.1, t=2.0.
        let s1 = scheduler.schedule(buffer_of(0.5, 0.5));
        assert!(s1.abs() < 1e-6);

        tokio::time::advance(Duration::from_millis(100)).await;
        let s2 = scheduler.schedule(buffer_of(0.3, 0.5));
        assert!((s2 - 0.5).abs() < 1e-6, "expected back-to-back start, got {s2}");

        tokio::time::advance(Duration::from_millis(1900)).await;
        let s3 = scheduler.schedule(buffer_of(0.7, 0.5));
        // Queue drained at 0.8; cursor must catch up to now = 2.0.
        assert!((s3 - 2.0).abs() < 1e-6, "expected catch-up to clock, got {s3}");
        assert!((scheduler.cursor() - 2.7).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_monotonic_under_jitter() {
        let (scheduler, _rx) = scheduler();
        let mut previous_start = f64::MIN;
        let mut previous_duration = 0.0;

        for (duration, arrival_delay_ms) in
            [(0.2, 0u64), (0.05, 10), (0.4, 500), (0.1, 5), (0.3, 1500)]
        {
            tokio::time::advance(Duration::from_millis(arrival_delay_ms)).await;
            let start = scheduler.schedule(buffer_of(duration, 0.5));
            assert!(start + 1e-9 >= previous_start + previous_duration);
            assert!(start + 1e-9 >= 0.0);
            previous_start = start;
            previous_duration = duration;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_set_drains_after_natural_completion() {
        let (scheduler, mut rx) = scheduler();
        scheduler.schedule(buffer_of(0.25, 0.5));
        scheduler.schedule(buffer_of(0.25, 0.5));
        assert_eq!(scheduler.active_count(), 2);

        tokio::time::advance(Duration::from_millis(600)).await;
        rx.recv().await.expect("drained signal");
        assert_eq!(scheduler.active_count(), 0);
        assert!(!scheduler.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_clears_active_set() {
        let (scheduler, mut rx) = scheduler();
        scheduler.schedule(buffer_of(1.0, 0.5));
        scheduler.schedule(buffer_of(2.0, 0.5));
        scheduler.schedule(buffer_of(3.0, 0.5));
        assert_eq!(scheduler.active_count(), 3);

        scheduler.stop_all();
        assert_eq!(scheduler.active_count(), 0);

        // Aborted handles must not emit a drained signal.
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_level_tracks_play_head() {
        let (scheduler, _rx) = scheduler();
        assert_eq!(scheduler.output_level(), 0.0);

        scheduler.schedule(buffer_of(1.0, 0.5));
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(scheduler.output_level() > 0.0);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert_eq!(scheduler.output_level(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_buffer_is_gated_to_zero() {
        let (scheduler, _rx) = scheduler();
        scheduler.schedule(buffer_of(1.0, 0.005));
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(scheduler.output_level(), 0.0);
    }
}
