//! Enhancement settings
//!
//! One immutable value object carries every tunable of the chain, so all
//! call sites share the same constants instead of drifting copies. All
//! fields have serde defaults: a partial JSON document from an
//! application layer deserializes with the documented defaults filled in.

use serde::{Deserialize, Serialize};

/// Spectral shaping toggles (fixed-order biquad cascade)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqSettings {
    /// Master toggle for the filter stage
    pub enabled: bool,
    /// High-pass at 80 Hz (rumble removal)
    pub low_cut: bool,
    /// Peaking boost at 3 kHz, +1.5 dB (presence)
    pub presence: bool,
    /// High shelf at 10 kHz, +2 dB (air)
    pub high_shelf: bool,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            low_cut: true,
            presence: true,
            high_shelf: true,
        }
    }
}

/// Loudness normalization settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoudnessSettings {
    /// Whether gain toward the target loudness is applied
    pub enabled: bool,
    /// Target loudness in dB (approximate LUFS)
    pub target_db: f64,
}

impl Default for LoudnessSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_db: -14.0,
        }
    }
}

/// Soft/hard limiter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    /// Whether the limiter runs (independent of loudness normalization)
    pub enabled: bool,
    /// Ceiling in dB; -1 dB gives a linear ceiling of about 0.89
    pub ceiling_db: f64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ceiling_db: -1.0,
        }
    }
}

/// Stereo widening settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoSettings {
    /// Whether mid/side widening is applied
    pub enabled: bool,
    /// Width in percent; 0 is identity, 25 is the default gentle widen
    pub width_percent: u32,
}

impl Default for StereoSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            width_percent: 25,
        }
    }
}

impl StereoSettings {
    /// Width as a fraction (`width_percent` / 100)
    pub fn width(&self) -> f32 {
        self.width_percent as f32 / 100.0
    }
}

/// All tunables of the enhancement chain
///
/// Settings only toggle per-stage behavior; the stage order itself is
/// fixed (filters, dynamics, stereo, encode) and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementSettings {
    /// Spectral shaping
    pub eq: EqSettings,
    /// Loudness normalization
    pub loudness: LoudnessSettings,
    /// Output limiter
    pub limiter: LimiterSettings,
    /// Stereo widening
    pub stereo: StereoSettings,
}

impl EnhancementSettings {
    /// Settings with every stage disabled (identity chain up to encoding)
    pub fn bypass() -> Self {
        Self {
            eq: EqSettings {
                enabled: false,
                ..EqSettings::default()
            },
            loudness: LoudnessSettings {
                enabled: false,
                ..LoudnessSettings::default()
            },
            limiter: LimiterSettings {
                enabled: false,
                ..LimiterSettings::default()
            },
            stereo: StereoSettings {
                enabled: false,
                ..StereoSettings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = EnhancementSettings::default();
        assert!(settings.eq.enabled && settings.eq.low_cut);
        assert!(settings.eq.presence && settings.eq.high_shelf);
        assert!(settings.loudness.enabled);
        assert_eq!(settings.loudness.target_db, -14.0);
        assert!(settings.limiter.enabled);
        assert_eq!(settings.limiter.ceiling_db, -1.0);
        assert!(settings.stereo.enabled);
        assert_eq!(settings.stereo.width_percent, 25);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: EnhancementSettings =
            serde_json::from_str(r#"{"loudness":{"target_db":-16.0}}"#).unwrap();
        assert_eq!(settings.loudness.target_db, -16.0);
        assert!(settings.loudness.enabled);
        assert!(settings.eq.enabled);
        assert_eq!(settings.stereo.width_percent, 25);
    }

    #[test]
    fn bypass_disables_everything() {
        let settings = EnhancementSettings::bypass();
        assert!(!settings.eq.enabled);
        assert!(!settings.loudness.enabled);
        assert!(!settings.limiter.enabled);
        assert!(!settings.stereo.enabled);
        // Tunables keep their defaults
        assert_eq!(settings.loudness.target_db, -14.0);
    }

    #[test]
    fn width_fraction() {
        let settings = StereoSettings {
            enabled: true,
            width_percent: 50,
        };
        assert!((settings.width() - 0.5).abs() < f32::EPSILON);
    }
}
