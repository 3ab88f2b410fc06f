//! WAV encoder: PCM buffer to RIFF/WAVE bytes
//!
//! Canonical 44-byte header followed by 16-bit little-endian PCM,
//! interleaved frame-major/channel-minor:
//!
//! ```text
//! 0  "RIFF"             4  u32 LE 36+dataSize    8  "WAVE"
//! 12 "fmt "             16 u32 LE 16             20 u16 LE 1 (PCM)
//! 22 u16 LE channels    24 u32 LE sampleRate     28 u32 LE byteRate
//! 32 u16 LE blockAlign  34 u16 LE 16             36 "data"
//! 40 u32 LE dataSize = frames * channels * 2
//! 44 .. samples
//! ```
//!
//! Each sample is clamped to [-1, 1] and scaled asymmetrically
//! (negative by 0x8000, positive by 0x7FFF) so both rails map onto the
//! full int16 range.

use crate::error::{EngineError, Result};
use crest_core::{PcmBuffer, PipelineStage};

const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: u32 = 2;

/// Quantize one float sample to int16
#[inline]
fn quantize(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Serialize a buffer as 16-bit PCM WAV bytes
///
/// # Errors
/// Returns `InvariantViolation` if channel lengths drifted apart (a
/// programmer error upstream - the encoder never truncates or pads) and
/// `WavTooLarge` if the sample data would overflow the 32-bit RIFF size
/// fields.
pub fn encode(buffer: &PcmBuffer) -> Result<Vec<u8>> {
    let channels = buffer.planar();
    let frames = buffer.frames();
    for (i, channel) in channels.iter().enumerate() {
        if channel.len() != frames {
            return Err(EngineError::InvariantViolation {
                stage: PipelineStage::Encoding,
                channel: i,
                expected: frames,
                actual: channel.len(),
            });
        }
    }

    let num_channels = channels.len() as u32;
    let data_size = frames as u64 * u64::from(num_channels) * u64::from(BYTES_PER_SAMPLE);
    if data_size > u64::from(u32::MAX - 36) {
        return Err(EngineError::WavTooLarge(data_size));
    }
    let data_size = data_size as u32;

    let sample_rate = buffer.sample_rate();
    let block_align = num_channels * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate * block_align;

    let mut out = Vec::with_capacity(HEADER_LEN + data_size as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_size).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16_u32.to_le_bytes());
    out.extend_from_slice(&1_u16.to_le_bytes()); // PCM
    out.extend_from_slice(&(num_channels as u16).to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&(block_align as u16).to_le_bytes());
    out.extend_from_slice(&16_u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    for frame in 0..frames {
        for channel in channels {
            out.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    debug_assert_eq!(out.len(), HEADER_LEN + data_size as usize);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let buffer = PcmBuffer::new(vec![vec![0.0; 100]; 2], 44100).unwrap();
        let bytes = encode(&buffer).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(&bytes[36..40], b"data");

        let data_size = 100 * 2 * 2_u32;
        assert_eq!(bytes[4..8], (36 + data_size).to_le_bytes());
        assert_eq!(bytes[16..20], 16_u32.to_le_bytes());
        assert_eq!(bytes[20..22], 1_u16.to_le_bytes());
        assert_eq!(bytes[22..24], 2_u16.to_le_bytes());
        assert_eq!(bytes[24..28], 44100_u32.to_le_bytes());
        assert_eq!(bytes[28..32], (44100_u32 * 4).to_le_bytes());
        assert_eq!(bytes[32..34], 4_u16.to_le_bytes());
        assert_eq!(bytes[34..36], 16_u16.to_le_bytes());
        assert_eq!(bytes[40..44], data_size.to_le_bytes());
        assert_eq!(bytes.len(), 44 + data_size as usize);
    }

    #[test]
    fn quantization_rails() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(-1.0), i16::MIN);
        // Out-of-range input clamps first
        assert_eq!(quantize(2.0), i16::MAX);
        assert_eq!(quantize(-3.0), i16::MIN);
        assert_eq!(quantize(0.5), (0.5 * 32767.0) as i16);
        assert_eq!(quantize(-0.5), (-0.5 * 32768.0) as i16);
    }

    #[test]
    fn samples_are_interleaved_frame_major() {
        let buffer = PcmBuffer::new(vec![vec![0.5, -0.5], vec![-1.0, 1.0]], 8000).unwrap();
        let bytes = encode(&buffer).unwrap();
        let data = &bytes[44..];

        let samples: Vec<i16> = data
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(
            samples,
            vec![quantize(0.5), quantize(-1.0), quantize(-0.5), quantize(1.0)]
        );
    }

    #[test]
    fn mono_encoding() {
        let buffer = PcmBuffer::new(vec![vec![0.25; 10]], 22050).unwrap();
        let bytes = encode(&buffer).unwrap();
        assert_eq!(bytes[22..24], 1_u16.to_le_bytes());
        assert_eq!(bytes[32..34], 2_u16.to_le_bytes()); // block align
        assert_eq!(bytes.len(), 44 + 20);
    }

    #[test]
    fn empty_buffer_is_header_only() {
        let buffer = PcmBuffer::new(vec![vec![]; 2], 44100).unwrap();
        let bytes = encode(&buffer).unwrap();
        assert_eq!(bytes.len(), 44);
        assert_eq!(bytes[40..44], 0_u32.to_le_bytes());
    }
}
