//! Crest Engine
//!
//! Deterministic multi-stage audio enhancement: spectral shaping,
//! loudness normalization, soft limiting, stereo widening, and canonical
//! WAV encoding over decoded PCM buffers.
//!
//! # Architecture
//!
//! ```text
//! PcmBuffer -> filters -> dynamics -> stereo -> wav  => bytes
//!      \
//!       `-> analyze (loudness + tempo, independent of enhancement)
//! ```
//!
//! Decoding of compressed formats is the caller's responsibility; the
//! engine's contract begins once PCM samples exist and ends with WAV
//! bytes. All operations are synchronous, CPU-bound and stateless
//! between calls.
//!
//! # Example
//!
//! ```ignore
//! use crest_core::{EnhancementSettings, NoProgress, PcmBuffer};
//! use crest_engine::{analyze, enhance};
//!
//! let buffer = PcmBuffer::from_interleaved(&samples, 2, 44100)?;
//!
//! let analysis = analyze(&buffer);
//! println!("{:.1} LUFS, {} BPM", analysis.loudness.lufs, analysis.tempo.bpm);
//!
//! let outcome = enhance(&buffer, &EnhancementSettings::default(), &NoProgress)?;
//! std::fs::write("enhanced.wav", &outcome.wav_bytes)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dynamics;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod stereo;
pub mod wav;

pub use error::{EngineError, Result};
pub use pipeline::{
    analyze, enhance, enhance_silent, enhance_with_cancel, EnhanceOutcome, TrackAnalysis,
};
