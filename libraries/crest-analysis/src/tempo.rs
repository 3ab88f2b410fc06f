//! Tempo estimation
//!
//! Two-step strategy over the first channel of a buffer:
//!
//! 1. **Peak picking** (primary): build an amplitude envelope by
//!    block-maximum decimation, smooth it with a short moving average,
//!    threshold at a fraction of the smoothed maximum, and collect local
//!    maxima with a minimum inter-peak spacing. The dominant inter-peak
//!    interval becomes the beat period.
//! 2. **Autocorrelation** (fallback, used when fewer than four peaks are
//!    found): correlate a mean-removed envelope of a bounded middle
//!    window against itself over lags corresponding to musically
//!    plausible periods and take the strongest lag.
//!
//! Falling back is not an error; the chosen strategy is reported on the
//! estimate. Either path converts the period to BPM and then doubles or
//! halves it into the [60, 180] range. Output is deterministic for a
//! given input; accuracy is heuristic, not guaranteed musically correct.

use crest_core::PcmBuffer;
use tracing::debug;

/// Lower bound of the normalized BPM range
pub const BPM_MIN: u32 = 60;
/// Upper bound of the normalized BPM range
pub const BPM_MAX: u32 = 180;

/// Effective rate of the peak-picking envelope, in Hz
const ENVELOPE_RATE_HZ: u32 = 200;
/// Moving-average smoothing window, in seconds
const SMOOTH_WINDOW_SECS: f64 = 0.05;
/// Peak threshold as a fraction of the smoothed envelope maximum
const PEAK_THRESHOLD_RATIO: f64 = 0.45;
/// Minimum spacing between accepted peaks, in seconds
const MIN_PEAK_SPACING_SECS: f64 = 0.28;
/// Peak-picking needs at least this many peaks to trust its intervals
const MIN_PEAKS: usize = 4;

/// Length of the autocorrelation analysis window, in seconds
const ACF_WINDOW_SECS: f64 = 10.0;
/// Effective rate of the (heavily decimated) autocorrelation envelope
const ACF_RATE_HZ: u32 = 100;
/// Shortest beat period considered by the autocorrelation, in seconds
const ACF_MIN_PERIOD_SECS: f64 = 0.33;
/// Longest beat period considered by the autocorrelation, in seconds
const ACF_MAX_PERIOD_SECS: f64 = 1.0;

/// BPM reported when neither strategy finds a usable period
const FALLBACK_BPM: u32 = 120;

/// Which strategy produced a tempo estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempoMethod {
    /// Primary envelope peak picking
    PeakPicking,
    /// Autocorrelation of the envelope (degraded but best-effort path)
    Autocorrelation,
    /// Input too short or degenerate for either strategy; default tempo
    Fallback,
}

/// Tempo estimate: integer BPM, always inside [60, 180]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoEstimate {
    /// Beats per minute, normalized by octave doubling/halving
    pub bpm: u32,
    /// Strategy that produced the estimate
    pub method: TempoMethod,
}

/// Tempo analyzer
///
/// Stateless; every call analyzes the first channel of the given buffer
/// from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempoAnalyzer;

impl TempoAnalyzer {
    /// Create a tempo analyzer
    pub fn new() -> Self {
        Self
    }

    /// Estimate the tempo of a buffer
    ///
    /// Total over any buffer: even silence or sub-second input yields an
    /// integer BPM in [60, 180] (via the fallback default).
    pub fn estimate(&self, buffer: &PcmBuffer) -> TempoEstimate {
        let samples = buffer.channel(0);
        let sample_rate = buffer.sample_rate();

        if let Some(bpm) = peak_picking_bpm(samples, sample_rate) {
            debug!(bpm, "tempo from peak picking");
            return TempoEstimate {
                bpm,
                method: TempoMethod::PeakPicking,
            };
        }

        if let Some(bpm) = autocorrelation_bpm(samples, sample_rate) {
            debug!(bpm, "tempo from autocorrelation fallback");
            return TempoEstimate {
                bpm,
                method: TempoMethod::Autocorrelation,
            };
        }

        debug!(bpm = FALLBACK_BPM, "tempo fallback default");
        TempoEstimate {
            bpm: FALLBACK_BPM,
            method: TempoMethod::Fallback,
        }
    }
}

/// Primary strategy: envelope peak picking
fn peak_picking_bpm(samples: &[f32], sample_rate: u32) -> Option<u32> {
    let hop = decimation_hop(sample_rate, ENVELOPE_RATE_HZ);
    let envelope = decimated_envelope(samples, hop);
    if envelope.is_empty() {
        return None;
    }
    let effective_rate = f64::from(sample_rate) / hop as f64;

    let smoothed = moving_average(&envelope, window_len(effective_rate, SMOOTH_WINDOW_SECS));
    let peaks = pick_peaks(&smoothed, effective_rate);
    if peaks.len() < MIN_PEAKS {
        return None;
    }

    let interval = dominant_interval(&peaks)?;
    let period_secs = interval / effective_rate;
    normalize_bpm(60.0 / period_secs)
}

/// Fallback strategy: autocorrelation over a bounded middle window
fn autocorrelation_bpm(samples: &[f32], sample_rate: u32) -> Option<u32> {
    let window_len_samples = ((ACF_WINDOW_SECS * f64::from(sample_rate)) as usize).max(1);
    let window = middle_window(samples, window_len_samples);

    let hop = decimation_hop(sample_rate, ACF_RATE_HZ);
    let envelope = decimated_envelope(window, hop);
    let effective_rate = f64::from(sample_rate) / hop as f64;

    let min_lag = (ACF_MIN_PERIOD_SECS * effective_rate).ceil() as usize;
    let max_lag = ((ACF_MAX_PERIOD_SECS * effective_rate).floor() as usize)
        .min(envelope.len().saturating_sub(1));
    if min_lag == 0 || max_lag <= min_lag {
        return None;
    }

    // Mean removal keeps the DC component from always favoring the
    // shortest lag.
    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|&v| v - mean).collect();

    let mut best_lag = min_lag;
    let mut best_score = f64::NEG_INFINITY;
    for lag in min_lag..=max_lag {
        let pairs = centered.len() - lag;
        let score: f64 = (0..pairs).map(|i| centered[i] * centered[i + lag]).sum();
        // Normalize by pair count so long lags are not penalized
        let score = score / pairs as f64;
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    // A flat or aperiodic envelope never correlates positively with any
    // shifted copy of itself; report no estimate instead of a junk lag.
    if best_score <= 0.0 {
        return None;
    }

    let period_secs = best_lag as f64 / effective_rate;
    normalize_bpm(60.0 / period_secs)
}

/// Samples per envelope block for a target effective rate
fn decimation_hop(sample_rate: u32, target_rate: u32) -> usize {
    (sample_rate / target_rate).max(1) as usize
}

/// Absolute-value envelope via block maxima
///
/// Block maxima rather than naive subsampling, so single-sample
/// transients survive decimation.
fn decimated_envelope(samples: &[f32], hop: usize) -> Vec<f64> {
    samples
        .chunks(hop)
        .map(|block| {
            block
                .iter()
                .fold(0.0_f64, |acc, &s| acc.max(f64::from(s.abs())))
        })
        .collect()
}

/// Trailing moving average low-pass
///
/// The warm-up region divides by the full window, so a transient in the
/// first few samples is attenuated like any later one; dividing by the
/// filled count instead would let an opening click dominate the smoothed
/// maximum and starve the peak threshold.
fn moving_average(envelope: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(envelope.len());
    let mut sum = 0.0_f64;
    for (i, &value) in envelope.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= envelope[i - window];
        }
        out.push(sum / window as f64);
    }
    out
}

fn window_len(effective_rate: f64, seconds: f64) -> usize {
    ((effective_rate * seconds).round() as usize).max(1)
}

/// Local maxima above threshold, with a minimum inter-peak distance
///
/// When two candidates fall within the minimum distance, the larger one
/// wins; ties keep the earlier peak, so the result is deterministic.
fn pick_peaks(envelope: &[f64], effective_rate: f64) -> Vec<usize> {
    let max = envelope.iter().fold(0.0_f64, |acc, &v| acc.max(v));
    if max <= 0.0 {
        return Vec::new();
    }
    let threshold = max * PEAK_THRESHOLD_RATIO;
    let min_distance = window_len(effective_rate, MIN_PEAK_SPACING_SECS);

    let mut peaks: Vec<usize> = Vec::new();
    for i in 1..envelope.len().saturating_sub(1) {
        let v = envelope[i];
        if v < threshold || v <= envelope[i - 1] || v < envelope[i + 1] {
            continue;
        }
        match peaks.last_mut() {
            Some(last) if i - *last < min_distance => {
                if v > envelope[*last] {
                    *last = i;
                }
            }
            _ => peaks.push(i),
        }
    }
    peaks
}

/// Dominant inter-peak interval, in envelope samples
///
/// Median interval, refined by averaging the intervals within 25% of the
/// median. The median resists a stray peak; the refinement average
/// recovers sub-sample precision the quantized envelope cannot express.
fn dominant_interval(peaks: &[usize]) -> Option<f64> {
    if peaks.len() < 2 {
        return None;
    }
    let mut intervals: Vec<f64> = peaks.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    intervals.sort_by(f64::total_cmp);
    let median = intervals[intervals.len() / 2];
    if median <= 0.0 {
        return None;
    }

    let (sum, count) = intervals
        .iter()
        .filter(|&&v| (v - median).abs() <= median * 0.25)
        .fold((0.0_f64, 0_usize), |(s, c), &v| (s + v, c + 1));
    Some(sum / count as f64)
}

/// Centered slice of at most `len` samples
fn middle_window(samples: &[f32], len: usize) -> &[f32] {
    if samples.len() <= len {
        return samples;
    }
    let start = (samples.len() - len) / 2;
    &samples[start..start + len]
}

/// Double/halve a raw BPM into [60, 180] and round to an integer
fn normalize_bpm(mut bpm: f64) -> Option<u32> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }
    while bpm < f64::from(BPM_MIN) {
        bpm *= 2.0;
    }
    while bpm > f64::from(BPM_MAX) {
        bpm /= 2.0;
    }
    let rounded = bpm.round() as u32;
    Some(rounded.clamp(BPM_MIN, BPM_MAX))
}
