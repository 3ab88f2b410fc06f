//! Dynamics stage: loudness gain and soft limiting
//!
//! The gain leg measures the buffer with the same analyzer used for
//! reporting, computes the dB distance to the target, caps the boost at
//! +12 dB so near-silent material is not amplified into noise, and
//! applies the linear gain sample-wise.
//!
//! The limiter leg runs independently of normalization. Samples whose
//! magnitude exceeds 80% of the linear ceiling are saturated with
//! `tanh(s / ceiling) * ceiling` first; the hard clamp to
//! `[-ceiling, ceiling]` only acts as a final safety net. Running the
//! soft stage before the clamp keeps hard-clip artifacts out of the
//! audible path.

use crate::error::{EngineError, Result};
use crest_analysis::LoudnessAnalyzer;
use crest_core::{LimiterSettings, LoudnessSettings, PcmBuffer, PipelineStage};
use tracing::debug;

/// Maximum gain applied toward the loudness target
pub const MAX_BOOST_DB: f64 = 12.0;

/// Fraction of the ceiling above which soft saturation engages
const SOFT_KNEE_RATIO: f32 = 0.8;

/// Apply loudness gain and limiting, producing a new buffer
pub fn apply(
    buffer: &PcmBuffer,
    loudness: &LoudnessSettings,
    limiter: &LimiterSettings,
) -> Result<PcmBuffer> {
    let gain = if loudness.enabled {
        let measured = LoudnessAnalyzer::new().measure(buffer);
        let gain_db = measured.gain_to_target_db(loudness.target_db).min(MAX_BOOST_DB);
        debug!(
            lufs = measured.lufs,
            target_db = loudness.target_db,
            gain_db,
            "loudness gain computed"
        );
        if measured.will_clip_at_gain(gain_db) {
            debug!(
                peak_dbfs = ?measured.peak_dbfs,
                gain_db,
                "gain pushes the sample peak past full scale"
            );
        }
        10.0_f64.powf(gain_db / 20.0) as f32
    } else {
        1.0
    };

    let ceiling = 10.0_f64.powf(limiter.ceiling_db / 20.0) as f32;
    let soft_knee = ceiling * SOFT_KNEE_RATIO;

    let channels: Vec<Vec<f32>> = buffer
        .planar()
        .iter()
        .map(|channel| {
            channel
                .iter()
                .map(|&sample| {
                    let mut s = sample * gain;
                    if limiter.enabled {
                        if s.abs() > soft_knee {
                            s = (s / ceiling).tanh() * ceiling;
                        }
                        s = s.clamp(-ceiling, ceiling);
                    }
                    s
                })
                .collect()
        })
        .collect();

    PcmBuffer::new(channels, buffer.sample_rate()).map_err(|source| EngineError::Stage {
        stage: PipelineStage::Normalizing,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crest_analysis::SILENCE_FLOOR_LUFS;

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
    fn zeros_stay_zero() {
        let buffer = PcmBuffer::new(vec![vec![0.0; 4410]; 2], 44100).unwrap();
        let out = apply(
            &buffer,
            &LoudnessSettings::default(),
            &LimiterSettings::default(),
        )
        .unwrap();
        assert!(out.planar().iter().flatten().all(|&s| s == 0.0));

        // And the measurement of the result is still the silence floor
        let lufs = LoudnessAnalyzer::new().measure(&out).lufs;
        assert!((lufs - SILENCE_FLOOR_LUFS).abs() < 1e-3);
    }

    #[test]
    fn quiet_sine_reaches_target() {
        let buffer = stereo_sine(0.1, 2.0);
        let out = apply(
            &buffer,
            &LoudnessSettings::default(),
            &LimiterSettings::default(),
        )
        .unwrap();
        let lufs = LoudnessAnalyzer::new().measure(&out).lufs;
        assert!(
            (lufs - (-14.0)).abs() < 0.5,
            "expected about -14, got {lufs:.2}"
        );
    }

    #[test]
    fn boost_is_capped_at_12_db() {
        // Very quiet material: the uncapped gain would be far above +12
        let buffer = stereo_sine(0.001, 1.0);
        let out = apply(
            &buffer,
            &LoudnessSettings::default(),
            &LimiterSettings {
                enabled: false,
                ..LimiterSettings::default()
            },
        )
        .unwrap();

        let expected_peak = 0.001 * 10.0_f32.powf(12.0 / 20.0);
        let peak = out
            .planar()
            .iter()
            .flatten()
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()));
        assert!(
            (peak - expected_peak).abs() < expected_peak * 0.01,
            "peak {peak} vs expected {expected_peak}"
        );
    }

    #[test]
    fn limiter_enforces_ceiling() {
        let buffer = stereo_sine(0.95, 0.5);
        let out = apply(
            &buffer,
            &LoudnessSettings::default(),
            &LimiterSettings::default(),
        )
        .unwrap();

        let ceiling = 10.0_f64.powf(-1.0 / 20.0) as f32;
        for &sample in out.planar().iter().flatten() {
            assert!(
                sample.abs() <= ceiling,
                "sample {sample} exceeds ceiling {ceiling}"
            );
        }
    }

    #[test]
    fn limiter_runs_without_normalization() {
        let buffer = stereo_sine(0.95, 0.5);
        let disabled = LoudnessSettings {
            enabled: false,
            ..LoudnessSettings::default()
        };
        let out = apply(&buffer, &disabled, &LimiterSettings::default()).unwrap();

        let ceiling = 10.0_f64.powf(-1.0 / 20.0) as f32;
        let peak = out
            .planar()
            .iter()
            .flatten()
            .fold(0.0_f32, |acc, &s| acc.max(s.abs()));
        assert!(peak <= ceiling);
        // The 0.95 peaks were above the ceiling, so limiting happened
        assert!(peak < 0.95);
    }

    #[test]
    fn everything_disabled_is_identity() {
        let buffer = stereo_sine(0.5, 0.25);
        let out = apply(
            &buffer,
            &LoudnessSettings {
                enabled: false,
                ..LoudnessSettings::default()
            },
            &LimiterSettings {
                enabled: false,
                ..LimiterSettings::default()
            },
        )
        .unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn quiet_samples_below_knee_are_untouched_by_limiter() {
        let buffer = stereo_sine(0.3, 0.25);
        let disabled = LoudnessSettings {
            enabled: false,
            ..LoudnessSettings::default()
        };
        let out = apply(&buffer, &disabled, &LimiterSettings::default()).unwrap();
        // 0.3 < 0.8 * 0.891, so the soft stage never engages
        assert_eq!(out, buffer);
    }
}
