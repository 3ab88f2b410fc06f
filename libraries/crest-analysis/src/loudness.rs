//! Approximate integrated loudness
//!
//! This is a documented approximation, NOT ITU-R BS.1770 K-weighting:
//! an optional one-pole high-pass removes DC and sub-bass, then the
//! mean-square power over all samples and channels (weighted equally, no
//! surround weighting) is mapped to an LUFS-like scale:
//!
//! ```text
//! lufs = -0.691 + 10 * log10(max(mean_square, 1e-10))
//! ```
//!
//! The formula is intentionally kept as-is; upgrading to the broadcast
//! standard would shift every downstream number in the system.

use crest_core::PcmBuffer;
use tracing::debug;

/// One-pole high-pass coefficient for the DC/sub-bass pre-filter
const PRE_FILTER_COEFF: f64 = 0.995;

/// Mean-square clamp that bounds the loudness of silence
const MEAN_SQUARE_FLOOR: f64 = 1e-10;

/// Loudness reported for an all-zero buffer: `-0.691 + 10*log10(1e-10)`
pub const SILENCE_FLOOR_LUFS: f64 = -100.691;

/// Result of a loudness measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessMeasurement {
    /// Approximate integrated loudness (typically -60..0)
    pub lufs: f64,
    /// Sample peak in dBFS; `None` when the analyzed audio is all zeros
    pub peak_dbfs: Option<f64>,
}

impl LoudnessMeasurement {
    /// Gain in dB required to reach `target_db`
    pub fn gain_to_target_db(&self, target_db: f64) -> f64 {
        target_db - self.lufs
    }

    /// Whether applying `gain_db` would push the sample peak past 0 dBFS
    pub fn will_clip_at_gain(&self, gain_db: f64) -> bool {
        match self.peak_dbfs {
            Some(peak) => peak + gain_db > 0.0,
            None => false,
        }
    }
}

/// Mean-square loudness analyzer
///
/// Stateless between calls; configuration is fixed at construction.
///
/// # Example
///
/// ```ignore
/// use crest_analysis::LoudnessAnalyzer;
///
/// let measurement = LoudnessAnalyzer::new().measure(&buffer);
/// println!("{:.1} LUFS, peak {:?} dBFS", measurement.lufs, measurement.peak_dbfs);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LoudnessAnalyzer {
    /// Apply the one-pole high-pass pre-filter before squaring
    pre_filter: bool,
    /// Bound analysis to the first N seconds; `None` analyzes everything
    max_seconds: Option<f64>,
}

impl Default for LoudnessAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoudnessAnalyzer {
    /// Analyzer with the pre-filter enabled and no window bound
    pub fn new() -> Self {
        Self {
            pre_filter: true,
            max_seconds: None,
        }
    }

    /// Disable the DC/sub-bass pre-filter
    pub fn without_pre_filter(mut self) -> Self {
        self.pre_filter = false;
        self
    }

    /// Bound analysis to a representative window for long material
    pub fn with_max_seconds(mut self, seconds: f64) -> Self {
        self.max_seconds = Some(seconds.max(0.0));
        self
    }

    /// Measure the loudness of a buffer
    ///
    /// All channels contribute equally. An empty buffer measures at the
    /// silence floor with no peak.
    pub fn measure(&self, buffer: &PcmBuffer) -> LoudnessMeasurement {
        let frames = self.analysis_frames(buffer);

        let mut sum_squares = 0.0_f64;
        let mut peak = 0.0_f64;

        for channel in buffer.planar() {
            let window = &channel[..frames];
            if self.pre_filter {
                // One-pole high-pass: y[n] = x[n] - x[n-1] + c*y[n-1]
                let mut x1 = 0.0_f64;
                let mut y1 = 0.0_f64;
                for &sample in window {
                    let x = f64::from(sample);
                    let y = x - x1 + PRE_FILTER_COEFF * y1;
                    x1 = x;
                    y1 = y;
                    sum_squares += y * y;
                    peak = peak.max(x.abs());
                }
            } else {
                for &sample in window {
                    let x = f64::from(sample);
                    sum_squares += x * x;
                    peak = peak.max(x.abs());
                }
            }
        }

        let total_samples = frames * buffer.channel_count();
        let mean_square = if total_samples == 0 {
            0.0
        } else {
            sum_squares / total_samples as f64
        };

        let lufs = -0.691 + 10.0 * mean_square.max(MEAN_SQUARE_FLOOR).log10();
        let peak_dbfs = if peak > 0.0 {
            Some(20.0 * peak.log10())
        } else {
            None
        };

        debug!(
            lufs,
            ?peak_dbfs,
            frames,
            channels = buffer.channel_count(),
            "loudness measured"
        );

        LoudnessMeasurement { lufs, peak_dbfs }
    }

    /// Frames to analyze, honoring the optional window bound
    fn analysis_frames(&self, buffer: &PcmBuffer) -> usize {
        match self.max_seconds {
            Some(secs) => {
                let cap = (secs * f64::from(buffer.sample_rate())) as usize;
                buffer.frames().min(cap)
            }
            None => buffer.frames(),
        }
    }
}
