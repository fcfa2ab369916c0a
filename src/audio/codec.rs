//! PCM wire codec.
//!
//! The live session speaks base64-encoded 16-bit signed little-endian PCM:
//! 16 kHz mono on the microphone side, 24 kHz mono on the speaker side.
//! Encoding and decoding are pure functions that allocate fresh buffers per
//! call, so they are safe to run at arbitrary (even overlapping) times.

use base64::prelude::*;
use bytes::Bytes;

use crate::error::{VoiceError, VoiceResult};

/// Sample rate of captured microphone audio.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of synthesized audio received from the model.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// One outbound unit of captured audio, ready for the wire.
///
/// Constructed fresh per capture frame, consumed once by the session send
/// call, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Base64-encoded 16-bit LE PCM
    pub data: String,
    /// Format tag, e.g. `audio/pcm;rate=16000`
    pub mime_type: String,
}

impl AudioChunk {
    /// Encode a frame of floating-point samples in `[-1, 1]`.
    ///
    /// Samples are scaled by 32768 and truncated to i16. Out-of-range input
    /// wraps around rather than clamping; callers feeding well-formed
    /// microphone data never hit that path.
    pub fn from_samples(samples: &[f32]) -> Self {
        let mut raw = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            let value = (sample * 32768.0) as i32 as i16;
            raw.extend_from_slice(&value.to_le_bytes());
        }
        Self {
            data: BASE64_STANDARD.encode(&raw),
            mime_type: format!("audio/pcm;rate={INPUT_SAMPLE_RATE}"),
        }
    }
}

/// A materialized, playable audio buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Interleaved floating-point samples in `[-1, 1]`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (mono by default)
    pub channels: u16,
}

impl AudioBuffer {
    /// Materialize raw 16-bit LE PCM bytes into a mono buffer.
    ///
    /// An odd byte count means a truncated frame and is rejected.
    pub fn from_pcm16(raw: &[u8], sample_rate: u32) -> VoiceResult<Self> {
        if raw.len() % 2 != 0 {
            return Err(VoiceError::Decode(format!(
                "truncated PCM frame: {} bytes",
                raw.len()
            )));
        }
        let samples = raw
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();
        Ok(Self {
            samples,
            sample_rate,
            channels: 1,
        })
    }

    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / (self.channels as f64 * self.sample_rate as f64)
    }
}

/// Decode a base64 payload to raw bytes.
pub fn decode_base64(data: &str) -> VoiceResult<Bytes> {
    BASE64_STANDARD
        .decode(data)
        .map(Bytes::from)
        .map_err(|e| VoiceError::Decode(format!("malformed base64: {e}")))
}

/// Decode a base64-encoded server fragment into a playable buffer.
pub fn decode_fragment(data: &str, sample_rate: u32) -> VoiceResult<AudioBuffer> {
    let raw = decode_base64(data)?;
    AudioBuffer::from_pcm16(&raw, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_within_quantization_error() {
        let samples: Vec<f32> = (0..4096)
            .map(|i| ((i as f32) * 0.013).sin() * 0.9)
            .collect();
        let chunk = AudioChunk::from_samples(&samples);
        let decoded = decode_fragment(&chunk.data, INPUT_SAMPLE_RATE).unwrap();

        assert_eq!(decoded.samples.len(), samples.len());
        for (orig, round) in samples.iter().zip(decoded.samples.iter()) {
            assert!(
                (orig - round).abs() <= 1.0 / 32768.0,
                "sample drifted beyond quantization error: {orig} vs {round}"
            );
        }
    }

    #[test]
    fn test_mime_tag_names_format_and_rate() {
        let chunk = AudioChunk::from_samples(&[0.0; 16]);
        assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
    }

    #[test]
    fn test_out_of_range_input_wraps() {
        // 1.5 * 32768 = 49152, which wraps to -16384 in 16 bits.
        let chunk = AudioChunk::from_samples(&[1.5]);
        let decoded = decode_fragment(&chunk.data, INPUT_SAMPLE_RATE).unwrap();
        assert_eq!(decoded.samples[0], -16384.0 / 32768.0);
    }

    #[test]
    fn test_malformed_base64_is_decode_error() {
        let result = decode_fragment("not valid base64!!!", OUTPUT_SAMPLE_RATE);
        assert!(matches!(result, Err(VoiceError::Decode(_))));
    }

    #[test]
    fn test_truncated_frame_is_decode_error() {
        let result = AudioBuffer::from_pcm16(&[0x00, 0x01, 0x02], OUTPUT_SAMPLE_RATE);
        assert!(matches!(result, Err(VoiceError::Decode(_))));
    }

    #[test]
    fn test_buffer_duration() {
        let buffer = AudioBuffer {
            samples: vec![0.0; 24_000],
            sample_rate: OUTPUT_SAMPLE_RATE,
            channels: 1,
        };
        assert!((buffer.duration() - 1.0).abs() < f64::EPSILON);
    }
}
