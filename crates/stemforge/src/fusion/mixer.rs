//! Additive stem mixing

use stemforge_core::audio_file::resample;
use stemforge_core::{AudioClip, StereoBuffer};

use super::error::{FusionError, Result};

/// Ceiling the mix is scaled down to when the sum clips
const PEAK_CEILING: f32 = 1.0;

/// A stem ready to be mixed, already at the master tempo
#[derive(Debug, Clone)]
pub struct MixInput {
    pub role: String,
    pub clip: AudioClip,
    pub volume: f32,
}

/// Sum `inputs` into one clip
///
/// The first input fixes the sample rate; later inputs at another rate are
/// resampled. The mix is as long as the longest input. If the sum exceeds
/// full scale it is scaled down as a whole, otherwise it is left untouched.
pub fn mix(inputs: &[MixInput]) -> Result<AudioClip> {
    let (first, rest) = inputs.split_first().ok_or(FusionError::NothingToFuse)?;
    let sample_rate = first.clip.sample_rate;

    let mut buffer = first.clip.buffer.clone();
    buffer.scale(first.volume.max(0.0));

    for input in rest {
        if input.clip.sample_rate == sample_rate {
            buffer.overlay(&input.clip.buffer, input.volume.max(0.0));
        } else {
            log::debug!(
                "[FUSION] Resampling {} from {} Hz to {} Hz",
                input.role,
                input.clip.sample_rate,
                sample_rate
            );
            let converted = resample(&input.clip, sample_rate)?;
            buffer.overlay(&converted.buffer, input.volume.max(0.0));
        }
    }

    limit_peak(&mut buffer);
    Ok(AudioClip::new(sample_rate, buffer))
}

fn limit_peak(buffer: &mut StereoBuffer) {
    let peak = buffer.peak();
    if peak > PEAK_CEILING {
        log::info!("[FUSION] Mix peaks at {:.2}, scaling down", peak);
        buffer.scale(PEAK_CEILING / peak);
    }
}
