//! Global tempo estimation
//!
//! Autocorrelates the onset envelope over the lag range allowed by
//! [`BpmConfig`], weights every lag by a log-normal prior centred on
//! [`PRIOR_CENTER_BPM`], and refines the winning lag with parabolic
//! interpolation.
//!
//! The estimate is a heuristic: identical input always gives the identical
//! answer, but octave errors on sparse material are possible. A return value
//! of `0.0` means "undetectable" and callers decide what that implies.

use super::onset::{onset_envelope, HOP_SIZE};
use super::BpmConfig;
use crate::types::AudioClip;

/// Centre of the tempo prior
pub const PRIOR_CENTER_BPM: f64 = 120.0;

/// Standard deviation of the tempo prior, in octaves
const PRIOR_OCTAVES: f64 = 1.0;

/// Sentinel returned when no tempo can be detected
pub const UNDETECTABLE_BPM: f64 = 0.0;

/// Estimate the tempo of a mono signal
///
/// # Arguments
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate of `samples`
/// * `config` - Allowed tempo range
///
/// # Returns
/// BPM, or [`UNDETECTABLE_BPM`] if the signal is too short, silent, or has
/// no periodic structure inside the allowed range
pub fn estimate_bpm(samples: &[f32], sample_rate: u32, config: &BpmConfig) -> f64 {
    if sample_rate == 0 {
        return UNDETECTABLE_BPM;
    }

    let mut config = config.clone();
    config.validate();

    let envelope = onset_envelope(samples);
    let frame_rate = sample_rate as f64 / HOP_SIZE as f64;

    // Lag (in envelope frames) for a tempo: frames per beat
    let lag_for = |bpm: f64| frame_rate * 60.0 / bpm;
    let min_lag = lag_for(config.max_tempo as f64).floor().max(1.0) as usize;
    let max_lag = lag_for(config.min_tempo as f64).ceil() as usize;

    if envelope.len() < max_lag * 2 {
        log::debug!(
            "estimate_bpm: envelope too short ({} frames, need {})",
            envelope.len(),
            max_lag * 2
        );
        return UNDETECTABLE_BPM;
    }

    let energy: f64 = envelope.iter().map(|&v| (v as f64) * (v as f64)).sum();
    if energy <= f64::EPSILON {
        log::debug!("estimate_bpm: flat onset envelope");
        return UNDETECTABLE_BPM;
    }

    // Weighted autocorrelation for lags min_lag-1 ..= max_lag+1 so the
    // parabolic refinement always has neighbours
    let first_lag = min_lag.saturating_sub(1).max(1);
    let last_lag = (max_lag + 1).min(envelope.len() - 1);
    let scores: Vec<f64> = (first_lag..=last_lag)
        .map(|lag| {
            let acf: f64 = envelope[lag..]
                .iter()
                .zip(envelope.iter())
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum::<f64>()
                / energy;
            let bpm = frame_rate * 60.0 / lag as f64;
            acf * tempo_prior(bpm)
        })
        .collect();

    // Best lag inside the permitted range (ties resolve to the shorter lag)
    let mut best: Option<(usize, f64)> = None;
    for lag in min_lag..=max_lag.min(last_lag) {
        let score = scores[lag - first_lag];
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((lag, score));
        }
    }

    let (best_lag, best_score) = match best {
        Some(found) if found.1 > 0.0 => found,
        _ => {
            log::debug!("estimate_bpm: no periodic peak in range");
            return UNDETECTABLE_BPM;
        }
    };

    let refined_lag = refine_peak(&scores, best_lag - first_lag) + first_lag as f64;
    let bpm = frame_rate * 60.0 / refined_lag;

    if !bpm.is_finite() || bpm <= 0.0 {
        return UNDETECTABLE_BPM;
    }

    log::debug!(
        "estimate_bpm: lag {:.2} frames -> {:.2} BPM (score {:.4})",
        refined_lag,
        bpm,
        best_score
    );

    bpm.clamp(config.min_tempo as f64, config.max_tempo as f64)
}

/// Estimate the tempo of a decoded clip (mono mixdown)
pub fn estimate_clip_bpm(clip: &AudioClip, config: &BpmConfig) -> f64 {
    estimate_bpm(&clip.buffer.to_mono(), clip.sample_rate, config)
}

/// Log-normal weighting around the prior centre
fn tempo_prior(bpm: f64) -> f64 {
    let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_OCTAVES;
    (-0.5 * octaves * octaves).exp()
}

/// Parabolic interpolation of a peak at `index`; returns a fractional index
fn refine_peak(scores: &[f64], index: usize) -> f64 {
    if index == 0 || index + 1 >= scores.len() {
        return index as f64;
    }
    let (left, centre, right) = (scores[index - 1], scores[index], scores[index + 1]);
    let denom = left - 2.0 * centre + right;
    if denom.abs() < f64::EPSILON {
        return index as f64;
    }
    let offset = 0.5 * (left - right) / denom;
    index as f64 + offset.clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::click_track;

    const SR: u32 = 44100;

    #[test]
    fn test_detects_120_bpm_click_track() {
        let clip = click_track(120.0, 8.0, SR);
        let bpm = estimate_clip_bpm(&clip, &BpmConfig::default());
        assert!((bpm - 120.0).abs() < 3.0, "detected {:.2}", bpm);
    }

    #[test]
    fn test_detects_90_bpm_click_track() {
        let clip = click_track(90.0, 8.0, SR);
        let bpm = estimate_clip_bpm(&clip, &BpmConfig::default());
        assert!((bpm - 90.0).abs() < 3.0, "detected {:.2}", bpm);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let clip = click_track(104.0, 6.0, SR);
        let first = estimate_clip_bpm(&clip, &BpmConfig::default());
        let second = estimate_clip_bpm(&clip, &BpmConfig::default());
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_silence_is_undetectable() {
        let silence = vec![0.0f32; SR as usize * 5];
        assert_eq!(estimate_bpm(&silence, SR, &BpmConfig::default()), UNDETECTABLE_BPM);
    }

    #[test]
    fn test_too_short_is_undetectable() {
        let clip = click_track(120.0, 0.5, SR);
        assert_eq!(estimate_clip_bpm(&clip, &BpmConfig::default()), UNDETECTABLE_BPM);
    }

    #[test]
    fn test_prior_prefers_centre() {
        assert!(tempo_prior(120.0) > tempo_prior(60.0));
        assert!(tempo_prior(120.0) > tempo_prior(240.0));
        assert!((tempo_prior(120.0) - 1.0).abs() < 1e-12);
    }
}
