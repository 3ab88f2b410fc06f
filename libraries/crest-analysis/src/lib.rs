//! Loudness and tempo analysis for Crest
//!
//! This crate provides the two offline analyzers of the engine:
//! - Approximate integrated loudness from mean-square power
//! - Tempo estimation (peak picking with an autocorrelation fallback)
//!
//! Both analyzers are pure functions over a [`crest_core::PcmBuffer`]:
//! no shared state, deterministic output for a given input.
//!
//! # Example
//!
//! ```ignore
//! use crest_analysis::{LoudnessAnalyzer, TempoAnalyzer};
//!
//! let loudness = LoudnessAnalyzer::new().measure(&buffer);
//! println!("approx. {:.1} LUFS", loudness.lufs);
//!
//! let tempo = TempoAnalyzer::new().estimate(&buffer);
//! println!("{} BPM ({:?})", tempo.bpm, tempo.method);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod loudness;
pub mod tempo;

pub use loudness::{LoudnessAnalyzer, LoudnessMeasurement, SILENCE_FLOOR_LUFS};
pub use tempo::{TempoAnalyzer, TempoEstimate, TempoMethod, BPM_MAX, BPM_MIN};
