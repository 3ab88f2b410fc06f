//! Crest Core
//!
//! Platform-agnostic core types for the Crest enhancement engine.
//!
//! This crate defines the data model shared by the analysis and engine
//! crates:
//! - **PCM Buffer**: planar float samples with a shared sample rate
//! - **Enhancement Settings**: the immutable tunables of the chain
//! - **Progress & Cancellation**: injected reporting at stage boundaries
//! - **Error Handling**: `BufferError` for malformed PCM at the boundary
//!
//! The engine itself is stateless between calls: one buffer is created
//! per track by the caller's decoder, flows through the chain, and is
//! discarded after encoding.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod progress;
pub mod settings;

pub use buffer::PcmBuffer;
pub use error::{BufferError, Result};
pub use progress::{CancelToken, NoProgress, PipelineStage, ProgressSink};
pub use settings::{
    EnhancementSettings, EqSettings, LimiterSettings, LoudnessSettings, StereoSettings,
};
