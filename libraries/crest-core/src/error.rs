//! Error types for the core data model

use thiserror::Error;

/// Result type alias using `BufferError`
pub type Result<T> = std::result::Result<T, BufferError>;

/// Errors raised when constructing or validating a PCM buffer
///
/// Decoding of compressed formats happens outside the engine; these
/// errors are the boundary check that only well-formed PCM enters the
/// processing chain. They are fatal for the track in question - there is
/// no retry inside the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Buffer has no channels at all
    #[error("PCM buffer has no channels")]
    NoChannels,

    /// Channel arrays are not all the same length
    #[error("channel {channel} has {actual} samples, expected {expected}")]
    MismatchedChannels {
        /// Index of the offending channel
        channel: usize,
        /// Frame count of channel 0
        expected: usize,
        /// Frame count of the offending channel
        actual: usize,
    },

    /// Sample rate must be positive
    #[error("invalid sample rate: {0} Hz (must be > 0)")]
    InvalidSampleRate(u32),
}
