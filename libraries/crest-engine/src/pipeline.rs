//! Enhancement pipeline orchestrator
//!
//! Linear state machine over the fixed stage order:
//!
//! ```text
//! Idle -> Decoded -> Filtering -> Normalizing -> Widening -> Encoding -> Done
//!                        \___________\____________\____________\-> Failed
//! ```
//!
//! Settings toggle what each stage does, never the order. Stage
//! boundaries are the only points where progress is reported and
//! cancellation is checked; within a stage the pipeline runs to
//! completion. Results are all-or-nothing: a failing run yields an
//! [`EngineError`] naming the stage and cause, never a partially
//! processed buffer. The orchestrator holds no state between runs and
//! owns no presentation resources.

use crate::error::{EngineError, Result};
use crate::{dynamics, filters, stereo, wav};
use crest_analysis::{LoudnessAnalyzer, LoudnessMeasurement, TempoAnalyzer, TempoEstimate};
use crest_core::{
    CancelToken, EnhancementSettings, NoProgress, PcmBuffer, PipelineStage, ProgressSink,
};
use tracing::debug;

/// Progress percent reported at each stage boundary
const STAGE_PERCENT: [(PipelineStage, u8); 5] = [
    (PipelineStage::Decoding, 10),
    (PipelineStage::Filtering, 25),
    (PipelineStage::Normalizing, 50),
    (PipelineStage::Widening, 70),
    (PipelineStage::Encoding, 90),
];

/// Internal state model of the orchestrator; surfaces through progress
/// reports and stage-named errors, not as a returned value
#[derive(Debug, Clone, Copy)]
enum PipelineState {
    /// No buffer accepted yet
    Idle,
    /// Input validated, ready to process
    Decoded,
    /// Running the named stage
    Running(PipelineStage),
    /// Finished successfully
    Done,
    /// Aborted; the error names the stage
    Failed,
}

/// Combined result of the analyze entry point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackAnalysis {
    /// Approximate integrated loudness and sample peak
    pub loudness: LoudnessMeasurement,
    /// Normalized tempo estimate
    pub tempo: TempoEstimate,
}

/// Result of a successful enhancement run
#[derive(Debug, Clone)]
pub struct EnhanceOutcome {
    /// Canonical 16-bit PCM WAV byte stream
    pub wav_bytes: Vec<u8>,
    /// Loudness re-measured on the processed audio before encoding
    pub resulting_lufs: f64,
}

/// Analyze a buffer: approximate loudness plus tempo estimate
///
/// The two analyzers run independently; both are total over well-formed
/// buffers, so analysis itself cannot fail.
pub fn analyze(buffer: &PcmBuffer) -> TrackAnalysis {
    TrackAnalysis {
        loudness: LoudnessAnalyzer::new().measure(buffer),
        tempo: TempoAnalyzer::new().estimate(buffer),
    }
}

/// Run the enhancement chain and encode the result as WAV bytes
///
/// Progress is reported synchronously on the calling thread at stage
/// boundaries. For cancellation support use [`enhance_with_cancel`].
pub fn enhance(
    buffer: &PcmBuffer,
    settings: &EnhancementSettings,
    progress: &dyn ProgressSink,
) -> Result<EnhanceOutcome> {
    Orchestrator::new(settings, progress, None).run(buffer)
}

/// [`enhance`] with a cooperative cancellation token
///
/// The token is checked only at stage boundaries; a cancelled run fails
/// with [`EngineError::Cancelled`] naming the boundary that observed it.
pub fn enhance_with_cancel(
    buffer: &PcmBuffer,
    settings: &EnhancementSettings,
    progress: &dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<EnhanceOutcome> {
    Orchestrator::new(settings, progress, Some(cancel)).run(buffer)
}

struct Orchestrator<'a> {
    settings: &'a EnhancementSettings,
    progress: &'a dyn ProgressSink,
    cancel: Option<&'a CancelToken>,
    state: PipelineState,
}

impl<'a> Orchestrator<'a> {
    fn new(
        settings: &'a EnhancementSettings,
        progress: &'a dyn ProgressSink,
        cancel: Option<&'a CancelToken>,
    ) -> Self {
        Self {
            settings,
            progress,
            cancel,
            state: PipelineState::Idle,
        }
    }

    fn run(mut self, buffer: &PcmBuffer) -> Result<EnhanceOutcome> {
        let result = self.run_stages(buffer);
        match &result {
            Ok(_) => self.state = PipelineState::Done,
            Err(err) => {
                self.state = PipelineState::Failed;
                debug!(error = %err, "enhancement failed");
            }
        }
        debug!(state = ?self.state, "pipeline finished");
        result
    }

    fn run_stages(&mut self, buffer: &PcmBuffer) -> Result<EnhanceOutcome> {
        self.enter(PipelineStage::Decoding)?;
        self.state = PipelineState::Decoded;
        debug!(
            channels = buffer.channel_count(),
            frames = buffer.frames(),
            sample_rate = buffer.sample_rate(),
            "buffer accepted"
        );

        self.enter(PipelineStage::Filtering)?;
        let filtered = filters::apply(buffer, &self.settings.eq)?;

        self.enter(PipelineStage::Normalizing)?;
        let normalized =
            dynamics::apply(&filtered, &self.settings.loudness, &self.settings.limiter)?;

        self.enter(PipelineStage::Widening)?;
        let widened = stereo::apply(&normalized, &self.settings.stereo)?;

        self.enter(PipelineStage::Encoding)?;
        let resulting_lufs = LoudnessAnalyzer::new().measure(&widened).lufs;
        let wav_bytes = wav::encode(&widened)?;

        self.progress.report(PipelineStage::Encoding, 100);
        debug!(resulting_lufs, bytes = wav_bytes.len(), "enhancement done");

        Ok(EnhanceOutcome {
            wav_bytes,
            resulting_lufs,
        })
    }

    /// Stage boundary: check cancellation, record state, report progress
    fn enter(&mut self, stage: PipelineStage) -> Result<()> {
        if let Some(token) = self.cancel {
            if token.is_cancelled() {
                return Err(EngineError::Cancelled { stage });
            }
        }
        self.state = PipelineState::Running(stage);
        let percent = STAGE_PERCENT
            .iter()
            .find(|(s, _)| *s == stage)
            .map_or(0, |(_, p)| *p);
        self.progress.report(stage, percent);
        Ok(())
    }
}

/// Convenience wrapper for callers that do not report progress
pub fn enhance_silent(
    buffer: &PcmBuffer,
    settings: &EnhancementSettings,
) -> Result<EnhanceOutcome> {
    enhance(buffer, settings, &NoProgress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        reports: Mutex<Vec<(PipelineStage, u8)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                reports: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressSink for RecordingSink {
        fn report(&self, stage: PipelineStage, percent: u8) {
            self.reports.lock().unwrap().push((stage, percent));
        }
    }

    fn stereo_sine(amplitude: f32, seconds: f32) -> PcmBuffer {
        let rate = 44100_u32;
        let channel: Vec<f32> = (0..(seconds * rate as f32) as usize)
            .map(|i| {
                let t = i as f32 / rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect();
        PcmBuffer::new(vec![channel.clone(), channel], rate).unwrap()
    }

    #[test]
    fn progress_reports_in_stage_order() {
        let sink = RecordingSink::new();
        let buffer = stereo_sine(0.1, 0.5);
        enhance(&buffer, &EnhancementSettings::default(), &sink).unwrap();

        let reports = sink.reports.lock().unwrap();
        let stages: Vec<PipelineStage> = reports.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::Decoding,
                PipelineStage::Filtering,
                PipelineStage::Normalizing,
                PipelineStage::Widening,
                PipelineStage::Encoding,
                PipelineStage::Encoding,
            ]
        );
        let percents: Vec<u8> = reports.iter().map(|(_, p)| *p).collect();
        assert_eq!(percents, vec![10, 25, 50, 70, 90, 100]);
    }

    #[test]
    fn cancellation_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let buffer = stereo_sine(0.1, 0.1);
        let err = enhance_with_cancel(
            &buffer,
            &EnhancementSettings::default(),
            &NoProgress,
            &token,
        )
        .unwrap_err();
        match err {
            EngineError::Cancelled { stage } => assert_eq!(stage, PipelineStage::Decoding),
            other => panic!("expected Cancelled, got {other:?}"),
        }
    }

    #[test]
    fn analyze_reports_loudness_and_tempo() {
        let buffer = stereo_sine(0.1, 2.0);
        let analysis = analyze(&buffer);
        assert!(analysis.loudness.lufs < -20.0 && analysis.loudness.lufs > -30.0);
        assert!((60..=180).contains(&analysis.tempo.bpm));
    }

    #[test]
    fn enhance_produces_wav_of_expected_size() {
        let buffer = stereo_sine(0.1, 0.25);
        let outcome = enhance_silent(&buffer, &EnhancementSettings::default()).unwrap();
        assert_eq!(outcome.wav_bytes.len(), 44 + buffer.frames() * 2 * 2);
        assert_eq!(&outcome.wav_bytes[0..4], b"RIFF");
    }

    #[test]
    fn bypass_settings_round_trip_quantization_only() {
        let buffer = stereo_sine(0.5, 0.1);
        let outcome = enhance_silent(&buffer, &EnhancementSettings::bypass()).unwrap();

        // With every stage disabled, the encoded samples are exactly the
        // quantized input samples.
        let data = &outcome.wav_bytes[44..];
        let interleaved = buffer.to_interleaved();
        for (i, pair) in data.chunks_exact(2).enumerate() {
            let encoded = i16::from_le_bytes([pair[0], pair[1]]);
            let s = interleaved[i].clamp(-1.0, 1.0);
            let expected = if s < 0.0 {
                (s * 32768.0) as i16
            } else {
                (s * 32767.0) as i16
            };
            assert_eq!(encoded, expected, "sample {i}");
        }
    }
}
