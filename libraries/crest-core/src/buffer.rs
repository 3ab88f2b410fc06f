//! PCM buffer type
//!
//! Samples are stored planar (one `Vec<f32>` per channel) because every
//! stage of the enhancement chain works on whole channels at a time.
//! Interleaved views are provided for callers that decode or play back
//! interleaved audio.

use crate::error::{BufferError, Result};

/// Decoded PCM audio: per-channel sample sequences with a shared rate
///
/// Samples are f32, nominally in [-1.0, 1.0]. Invariants enforced at
/// construction: at least one channel, all channel arrays the same
/// length, sample rate > 0.
///
/// Buffers are immutable by convention - every stage of the enhancement
/// chain produces a new buffer rather than mutating its input, so stages
/// compose and test independently.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl PcmBuffer {
    /// Create a buffer from planar channel data
    ///
    /// # Errors
    /// Returns an error if the channel list is empty, the channel arrays
    /// have differing lengths, or the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(BufferError::NoChannels);
        }
        if sample_rate == 0 {
            return Err(BufferError::InvalidSampleRate(sample_rate));
        }
        let expected = channels[0].len();
        for (i, ch) in channels.iter().enumerate().skip(1) {
            if ch.len() != expected {
                return Err(BufferError::MismatchedChannels {
                    channel: i,
                    expected,
                    actual: ch.len(),
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from interleaved samples (L R L R ... for stereo)
    ///
    /// # Errors
    /// Returns an error if `channels` is zero, the sample count is not
    /// divisible by the channel count, or the sample rate is zero.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(BufferError::NoChannels);
        }
        if samples.len() % channels != 0 {
            return Err(BufferError::MismatchedChannels {
                channel: channels - 1,
                expected: samples.len() / channels + 1,
                actual: samples.len() / channels,
            });
        }
        let frames = samples.len() / channels;
        let mut planar = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                planar[ch].push(sample);
            }
        }
        Self::new(planar, sample_rate)
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// True when the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of one channel
    ///
    /// # Panics
    /// Panics if `index` is out of range; use [`Self::channel_count`] first.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// All channels, planar
    pub fn planar(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Copy out as interleaved samples (frame-major, channel-minor)
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let n_ch = self.channel_count();
        let mut out = Vec::with_capacity(frames * n_ch);
        for frame in 0..frames {
            for ch in &self.channels {
                out.push(frame_sample(ch, frame));
            }
        }
        out
    }
}

#[inline]
fn frame_sample(channel: &[f32], frame: usize) -> f32 {
    // Channel lengths are validated at construction; indexing is safe.
    channel[frame]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_channel_list() {
        assert_eq!(PcmBuffer::new(vec![], 44100), Err(BufferError::NoChannels));
    }

    #[test]
    fn rejects_zero_sample_rate() {
        assert_eq!(
            PcmBuffer::new(vec![vec![0.0; 4]], 0),
            Err(BufferError::InvalidSampleRate(0))
        );
    }

    #[test]
    fn rejects_mismatched_channel_lengths() {
        let result = PcmBuffer::new(vec![vec![0.0; 4], vec![0.0; 3]], 44100);
        assert_eq!(
            result,
            Err(BufferError::MismatchedChannels {
                channel: 1,
                expected: 4,
                actual: 3,
            })
        );
    }

    #[test]
    fn interleave_round_trip() {
        let interleaved = [0.1, -0.1, 0.2, -0.2, 0.3, -0.3];
        let buffer = PcmBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frames(), 3);
        assert_eq!(buffer.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(buffer.channel(1), &[-0.1, -0.2, -0.3]);
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn interleaved_length_must_divide_by_channels() {
        assert!(PcmBuffer::from_interleaved(&[0.0; 5], 2, 44100).is_err());
    }

    #[test]
    fn duration() {
        let buffer = PcmBuffer::new(vec![vec![0.0; 44100]], 44100).unwrap();
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_frames_allowed() {
        let buffer = PcmBuffer::new(vec![vec![], vec![]], 48000).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.frames(), 0);
    }
}
