//! Microphone capture pipeline.
//!
//! Capture is abstracted behind [`CaptureDevice`] / [`CaptureSource`] so the
//! lifecycle manager never touches a concrete audio device: the device is a
//! process-scoped collaborator acquired once per session start and reused
//! across restarts. Two sources ship with the crate (a paced sine generator
//! and a WAV-file reader), which is enough for the demo binary and tests;
//! real microphone input plugs in through the same trait.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::audio::codec::{AudioChunk, INPUT_SAMPLE_RATE};
use crate::error::{VoiceError, VoiceResult};
use crate::live::LiveHandle;

/// Samples per capture frame at the input rate.
pub const CAPTURE_FRAME_SAMPLES: usize = 4096;

/// A continuous stream of fixed-size microphone frames.
#[async_trait]
pub trait CaptureSource: Send {
    /// Next frame of up to [`CAPTURE_FRAME_SAMPLES`] samples at 16 kHz, or
    /// `None` when the stream ends.
    async fn next_frame(&mut self) -> Option<Vec<f32>>;
}

/// Factory for capture streams; the microphone collaborator.
///
/// Acquisition may fail with a permission or availability error, in which
/// case the session start fails entirely and no capture is ever wired.
pub trait CaptureDevice: Send + Sync {
    fn acquire(&self) -> VoiceResult<Box<dyn CaptureSource>>;
}

// =============================================================================
// Sources
// =============================================================================

/// Endless sine tone paced at real-time frame cadence.
pub struct ToneSource {
    frequency: f32,
    phase: f32,
    interval: tokio::time::Interval,
}

impl ToneSource {
    pub fn new(frequency: f32) -> Self {
        let frame_period =
            Duration::from_secs_f64(CAPTURE_FRAME_SAMPLES as f64 / INPUT_SAMPLE_RATE as f64);
        Self {
            frequency,
            phase: 0.0,
            interval: tokio::time::interval(frame_period),
        }
    }
}

#[async_trait]
impl CaptureSource for ToneSource {
    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        self.interval.tick().await;
        let step = 2.0 * std::f32::consts::PI * self.frequency / INPUT_SAMPLE_RATE as f32;
        let frame = (0..CAPTURE_FRAME_SAMPLES)
            .map(|i| (self.phase + step * i as f32).sin() * 0.4)
            .collect();
        self.phase = (self.phase + step * CAPTURE_FRAME_SAMPLES as f32)
            % (2.0 * std::f32::consts::PI);
        Some(frame)
    }
}

/// Frames read from a 16 kHz mono WAV file, paced at real-time cadence.
pub struct WavSource {
    samples: std::vec::IntoIter<f32>,
    interval: tokio::time::Interval,
}

#[async_trait]
impl CaptureSource for WavSource {
    async fn next_frame(&mut self) -> Option<Vec<f32>> {
        self.interval.tick().await;
        let frame: Vec<f32> = self.samples.by_ref().take(CAPTURE_FRAME_SAMPLES).collect();
        if frame.is_empty() { None } else { Some(frame) }
    }
}

/// Capture device producing [`ToneSource`] streams.
pub struct ToneCaptureDevice {
    pub frequency: f32,
}

impl CaptureDevice for ToneCaptureDevice {
    fn acquire(&self) -> VoiceResult<Box<dyn CaptureSource>> {
        Ok(Box::new(ToneSource::new(self.frequency)))
    }
}

/// Capture device replaying a WAV file as the microphone.
pub struct WavCaptureDevice {
    pub path: PathBuf,
}

impl CaptureDevice for WavCaptureDevice {
    fn acquire(&self) -> VoiceResult<Box<dyn CaptureSource>> {
        let mut reader = hound::WavReader::open(&self.path)
            .map_err(|e| VoiceError::Acquisition(format!("{}: {e}", self.path.display())))?;
        let spec = reader.spec();
        if spec.channels != 1 || spec.sample_rate != INPUT_SAMPLE_RATE {
            return Err(VoiceError::Acquisition(format!(
                "expected {INPUT_SAMPLE_RATE} Hz mono WAV, got {} Hz {} ch",
                spec.sample_rate, spec.channels
            )));
        }
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .samples::<i16>()
                .filter_map(Result::ok)
                .map(|s| s as f32 / 32768.0)
                .collect(),
            hound::SampleFormat::Float => {
                reader.samples::<f32>().filter_map(Result::ok).collect()
            }
        };
        let frame_period =
            Duration::from_secs_f64(CAPTURE_FRAME_SAMPLES as f64 / INPUT_SAMPLE_RATE as f64);
        Ok(Box::new(WavSource {
            samples: samples.into_iter(),
            interval: tokio::time::interval(frame_period),
        }))
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Feeds encoded capture frames into the live session.
pub struct CapturePipeline;

impl CapturePipeline {
    /// Spawn the capture loop. Frames are encoded and handed to the session
    /// fire-and-forget; a failed send is logged and dropped, since the transport's
    /// own error event fires if the channel is truly broken. The loop stops
    /// on cancellation or when the source ends.
    pub fn spawn(
        mut source: Box<dyn CaptureSource>,
        handle: LiveHandle,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    frame = source.next_frame() => {
                        let Some(samples) = frame else {
                            tracing::info!("capture source ended");
                            break;
                        };
                        let chunk = AudioChunk::from_samples(&samples);
                        if let Err(e) = handle.send_realtime_input(chunk) {
                            tracing::debug!("dropping capture chunk: {e}");
                        }
                    }
                }
            }
            tracing::debug!("capture pipeline stopped");
        })
    }
}
