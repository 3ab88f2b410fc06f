//! Progress reporting and cooperative cancellation
//!
//! The orchestrator owns no presentation resources: progress goes through
//! an injected sink, and callbacks run synchronously on the calling
//! thread. Offloading to a background thread and marshaling callbacks is
//! the caller's responsibility.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Stages of the enhancement pipeline, in their fixed order
///
/// Settings toggle what each stage does, never the order. Progress is
/// reported and cancellation is checked only at these boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Input buffer accepted and validated
    Decoding,
    /// Biquad cascade (low cut, presence, high shelf)
    Filtering,
    /// Loudness gain and limiting
    Normalizing,
    /// Mid/side stereo widening
    Widening,
    /// WAV serialization
    Encoding,
}

impl PipelineStage {
    /// Stable stage name used in progress and error text
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decoding => "decoding",
            Self::Filtering => "filtering",
            Self::Normalizing => "normalizing",
            Self::Widening => "widening",
            Self::Encoding => "encoding",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for stage-boundary progress reports
///
/// Implementations must be cheap and non-blocking; the engine calls them
/// synchronously between stages.
pub trait ProgressSink {
    /// Called when the pipeline enters `stage`; `percent` is 0-100
    fn report(&self, stage: PipelineStage, percent: u8);
}

/// Default sink that discards all reports
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _stage: PipelineStage, _percent: u8) {}
}

/// Cooperative cancellation flag
///
/// Cloneable handle around a shared atomic. The pipeline checks it only
/// at stage boundaries, never mid-loop, so cancellation latency is one
/// stage at worst.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, non-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next stage boundary
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` has been called on any clone
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
