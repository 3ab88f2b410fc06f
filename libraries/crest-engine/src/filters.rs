//! Filter stage: fixed-order biquad cascade
//!
//! Applies, in fixed order, any enabled subset of:
//! - high-pass at 80 Hz (Q 0.707) for rumble removal
//! - peaking boost at 3 kHz (+1.5 dB, Q 1.0) for presence
//! - high shelf at 10 kHz (+2 dB) for air
//!
//! Disabled sub-stages are skipped entirely (identity pass-throughs,
//! never zero-gained); with everything disabled the output is
//! bit-identical to the input. Filters run per channel with fresh state,
//! so the stage holds nothing between calls.

use crate::error::{EngineError, Result};
use crest_core::{EqSettings, PcmBuffer, PipelineStage};

/// High-pass corner frequency in Hz
const LOW_CUT_HZ: f32 = 80.0;
/// High-pass Q (Butterworth)
const LOW_CUT_Q: f32 = 0.707;
/// Presence band center in Hz
const PRESENCE_HZ: f32 = 3000.0;
/// Presence boost in dB
const PRESENCE_GAIN_DB: f32 = 1.5;
/// Presence band Q
const PRESENCE_Q: f32 = 1.0;
/// Air shelf corner in Hz
const AIR_SHELF_HZ: f32 = 10000.0;
/// Air shelf boost in dB
const AIR_SHELF_GAIN_DB: f32 = 2.0;
/// Air shelf Q (Butterworth)
const AIR_SHELF_Q: f32 = 0.707;

/// Second-order IIR filter (RBJ cookbook coefficients)
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Biquad {
    /// High-pass filter
    fn high_pass(sample_rate: f32, frequency: f32, q: f32) -> Self {
        let omega = angular(sample_rate, frequency);
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 + cos_omega) / 2.0;
        let b1 = -(1.0 + cos_omega);
        let b2 = (1.0 + cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// Peaking EQ filter
    fn peaking(sample_rate: f32, frequency: f32, q: f32, gain_db: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let omega = angular(sample_rate, frequency);
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_omega;
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha / a;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    /// High shelf filter
    fn high_shelf(sample_rate: f32, frequency: f32, q: f32, gain_db: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let omega = angular(sample_rate, frequency);
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / q - 1.0) + 2.0).sqrt();
        let beta = 2.0 * a.sqrt() * alpha;

        let b0 = a * ((a + 1.0) + (a - 1.0) * cos_omega + beta);
        let b1 = -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega);
        let b2 = a * ((a + 1.0) + (a - 1.0) * cos_omega - beta);
        let a0 = (a + 1.0) - (a - 1.0) * cos_omega + beta;
        let a1 = 2.0 * ((a - 1.0) - (a + 1.0) * cos_omega);
        let a2 = (a + 1.0) - (a - 1.0) * cos_omega - beta;

        Self::normalized(b0, b1, b2, a0, a1, a2)
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Run the filter over one channel with fresh state
    fn process_channel(&self, samples: &mut [f32]) {
        let mut x1 = 0.0_f32;
        let mut x2 = 0.0_f32;
        let mut y1 = 0.0_f32;
        let mut y2 = 0.0_f32;

        for sample in samples {
            let x = *sample;
            let mut y = self.b0 * x + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;

            // Flush denormals to keep the recursion cheap
            if y.abs() < 1e-15 {
                y = 0.0;
            }

            x2 = x1;
            x1 = x;
            y2 = y1;
            y1 = y;
            *sample = y;
        }
    }
}

/// Angular frequency, clamped to 45% of the sample rate to keep
/// near-Nyquist coefficients stable
fn angular(sample_rate: f32, frequency: f32) -> f32 {
    let clamped = frequency.min(sample_rate * 0.45);
    2.0 * std::f32::consts::PI * clamped / sample_rate
}

/// Cascade of the enabled sub-stages, in fixed order
fn cascade(settings: &EqSettings, sample_rate: f32) -> Vec<Biquad> {
    let mut filters = Vec::with_capacity(3);
    if settings.low_cut {
        filters.push(Biquad::high_pass(sample_rate, LOW_CUT_HZ, LOW_CUT_Q));
    }
    if settings.presence {
        filters.push(Biquad::peaking(
            sample_rate,
            PRESENCE_HZ,
            PRESENCE_Q,
            PRESENCE_GAIN_DB,
        ));
    }
    if settings.high_shelf {
        filters.push(Biquad::high_shelf(
            sample_rate,
            AIR_SHELF_HZ,
            AIR_SHELF_Q,
            AIR_SHELF_GAIN_DB,
        ));
    }
    filters
}

/// Apply the filter stage to a buffer, producing a new buffer
pub fn apply(buffer: &PcmBuffer, settings: &EqSettings) -> Result<PcmBuffer> {
    let filters = if settings.enabled {
        cascade(settings, buffer.sample_rate() as f32)
    } else {
        Vec::new()
    };
    if filters.is_empty() {
        return Ok(buffer.clone());
    }

    let mut channels: Vec<Vec<f32>> = buffer.planar().to_vec();
    for channel in &mut channels {
        for filter in &filters {
            filter.process_channel(channel);
        }
    }

    PcmBuffer::new(channels, buffer.sample_rate()).map_err(|source| EngineError::Stage {
        stage: PipelineStage::Filtering,
        source,
    })
}
