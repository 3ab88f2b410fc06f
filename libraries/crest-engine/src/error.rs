//! Error types for the enhancement chain

use crest_core::{BufferError, PipelineStage};
use thiserror::Error;

/// Result type alias using `EngineError`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the enhancement pipeline
///
/// Results are all-or-nothing: a failing run yields one of these, never
/// a partially processed buffer. Every processing failure names the
/// stage it happened in.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The input buffer failed validation before any stage ran
    #[error("invalid input buffer: {0}")]
    InvalidBuffer(#[from] BufferError),

    /// A stage produced a malformed buffer
    #[error("{stage} stage failed: {source}")]
    Stage {
        /// Stage that failed
        stage: PipelineStage,
        /// Underlying cause
        source: BufferError,
    },

    /// Channel shape drifted between stages - a programmer error that
    /// must fail loudly, never silently truncate or pad
    #[error(
        "channel shape drift during {stage}: channel {channel} has {actual} frames, expected {expected}"
    )]
    InvariantViolation {
        /// Stage that detected the drift
        stage: PipelineStage,
        /// Offending channel index
        channel: usize,
        /// Frame count of channel 0
        expected: usize,
        /// Frame count of the offending channel
        actual: usize,
    },

    /// Cooperative cancellation was requested
    #[error("enhancement cancelled during {stage}")]
    Cancelled {
        /// Stage boundary where the cancellation was observed
        stage: PipelineStage,
    },

    /// Sample data would overflow the 32-bit RIFF size fields
    #[error("encoded WAV would exceed the RIFF size limit ({0} bytes of sample data)")]
    WavTooLarge(u64),
}

impl EngineError {
    /// Stage the error is attributed to, when one applies
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. }
            | Self::InvariantViolation { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            Self::WavTooLarge(_) => Some(PipelineStage::Encoding),
            Self::InvalidBuffer(_) => None,
        }
    }
}
