//! Audio pipeline: PCM wire codec, microphone capture, and gapless playback
//! scheduling.

pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{
    CAPTURE_FRAME_SAMPLES, CaptureDevice, CapturePipeline, CaptureSource, ToneCaptureDevice,
    ToneSource, WavCaptureDevice, WavSource,
};
pub use codec::{
    AudioBuffer, AudioChunk, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE, decode_base64,
    decode_fragment,
};
pub use playback::{NullSink, OutputClock, PlaybackScheduler, PlaybackSink, TokioClock};
