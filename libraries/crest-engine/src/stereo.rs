//! Stereo imager: mid/side width adjustment
//!
//! Mid/Side decomposition of channels 0 and 1:
//! - mid  = (L + R) / 2 (center content)
//! - side = (L - R) / 2, scaled by (1 + width)
//!
//! then recombined as `L' = mid + side`, `R' = mid - side`. Widening can
//! push recombined samples past full scale, so any frame whose louder
//! channel exceeds 0.99 is scaled down proportionally, both channels by
//! the same factor to keep the image centered.
//!
//! Buffers with fewer than two channels pass through unchanged, and only
//! channels 0/1 participate; any further channels are copied as-is.

use crate::error::{EngineError, Result};
use crest_core::{PcmBuffer, PipelineStage, StereoSettings};

/// Per-frame level above which clip-normalization engages
const CLIP_GUARD: f32 = 0.99;

/// Apply stereo widening, producing a new buffer
pub fn apply(buffer: &PcmBuffer, settings: &StereoSettings) -> Result<PcmBuffer> {
    // Width 0 is a documented identity; skipping it also keeps the clip
    // guard from touching already-hot material.
    if !settings.enabled || settings.width_percent == 0 || buffer.channel_count() < 2 {
        return Ok(buffer.clone());
    }

    let side_scale = 1.0 + settings.width();

    let mut channels: Vec<Vec<f32>> = buffer.planar().to_vec();
    let frames = buffer.frames();
    for i in 0..frames {
        let left = buffer.channel(0)[i];
        let right = buffer.channel(1)[i];

        let mid = (left + right) * 0.5;
        let side = (left - right) * 0.5 * side_scale;

        let mut new_left = mid + side;
        let mut new_right = mid - side;

        let max = new_left.abs().max(new_right.abs());
        if max > CLIP_GUARD {
            let scale = CLIP_GUARD / max;
            new_left *= scale;
            new_right *= scale;
        }

        channels[0][i] = new_left;
        channels[1][i] = new_right;
    }

    PcmBuffer::new(channels, buffer.sample_rate()).map_err(|source| EngineError::Stage {
        stage: PipelineStage::Widening,
        source,
    })
}
