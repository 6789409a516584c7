//! Per-stem enhancement post-filter
//!
//! A fixed chain keyed by [`EnhanceRole`]:
//!
//! | Role   | Chain                                                         |
//! |--------|---------------------------------------------------------------|
//! | Vocals | trim, normalize, `tanh(1.2x)*0.8`, pre-emphasis 0.97          |
//! | Drums  | trim, normalize, `x*1.3`, `tanh(1.1x)*0.9`                    |
//! | Bass   | trim, normalize, `x*1.4`, `tanh(1.2x)*0.8`                    |
//! | Other  | trim, normalize, `x*1.1`, pre-emphasis 0.95                   |
//!
//! Every chain ends with a hard clip to [-1, 1]. The enhanced stem is written
//! to a separate file; the source stem is never touched.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio_file::{read_audio, write_wav, AudioFileError};
use crate::types::{AudioClip, StereoBuffer, StereoSample};

/// Frame length for silence detection
const TRIM_FRAME: usize = 2048;
/// Hop between silence-detection frames
const TRIM_HOP: usize = 512;

/// Default silence threshold below the loudest frame, in dB
pub const DEFAULT_SILENCE_THRESHOLD_DB: f32 = 30.0;

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error(transparent)]
    Audio(#[from] AudioFileError),
}

pub type Result<T> = std::result::Result<T, EnhanceError>;

/// Which filter chain a stem gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhanceRole {
    Vocals,
    Drums,
    Bass,
    Other,
}

impl EnhanceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhanceRole::Vocals => "vocals",
            EnhanceRole::Drums => "drums",
            EnhanceRole::Bass => "bass",
            EnhanceRole::Other => "other",
        }
    }
}

/// Result of enhancing one stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhanceOutcome {
    /// Enhanced audio written to this path
    Written(PathBuf),
    /// Nothing left after trimming; no file written
    NoOp,
}

/// Enhance `input` and write the result to `output`
///
/// Returns [`EnhanceOutcome::NoOp`] without writing anything when the stem
/// trims down to nothing.
pub fn enhance_file(
    input: &Path,
    output: &Path,
    role: EnhanceRole,
    silence_threshold_db: f32,
) -> Result<EnhanceOutcome> {
    let clip = read_audio(input)?;

    match enhance_clip(&clip, role, silence_threshold_db) {
        Some(enhanced) => {
            write_wav(output, &enhanced)?;
            log::debug!(
                "enhance: {:?} ({}) -> {:?}",
                input.file_name().unwrap_or_default(),
                role.as_str(),
                output.file_name().unwrap_or_default()
            );
            Ok(EnhanceOutcome::Written(output.to_path_buf()))
        }
        None => {
            log::info!(
                "enhance: {:?} is silent below -{} dB, left unchanged",
                input.file_name().unwrap_or_default(),
                silence_threshold_db
            );
            Ok(EnhanceOutcome::NoOp)
        }
    }
}

/// Run the role's chain over a clip; `None` if it trims to nothing
pub fn enhance_clip(clip: &AudioClip, role: EnhanceRole, silence_threshold_db: f32) -> Option<AudioClip> {
    let mut buffer = trim_silence(&clip.buffer, silence_threshold_db)?;

    let peak = buffer.peak();
    if peak > 0.0 {
        buffer.scale(1.0 / peak);
    }

    match role {
        EnhanceRole::Vocals => {
            soft_clip(&mut buffer, 1.2, 0.8);
            pre_emphasis(&mut buffer, 0.97);
        }
        EnhanceRole::Drums => {
            buffer.scale(1.3);
            soft_clip(&mut buffer, 1.1, 0.9);
        }
        EnhanceRole::Bass => {
            buffer.scale(1.4);
            soft_clip(&mut buffer, 1.2, 0.8);
        }
        EnhanceRole::Other => {
            buffer.scale(1.1);
            pre_emphasis(&mut buffer, 0.95);
        }
    }

    for sample in buffer.iter_mut() {
        sample.left = sample.left.clamp(-1.0, 1.0);
        sample.right = sample.right.clamp(-1.0, 1.0);
    }

    Some(AudioClip::new(clip.sample_rate, buffer))
}

/// Strip leading and trailing frames quieter than `threshold_db` below the
/// loudest frame (RMS of the mono mixdown)
fn trim_silence(buffer: &StereoBuffer, threshold_db: f32) -> Option<StereoBuffer> {
    if buffer.is_empty() {
        return None;
    }

    let mono = buffer.to_mono();
    let frame_count = 1 + mono.len().saturating_sub(1) / TRIM_HOP;
    let rms: Vec<f32> = (0..frame_count)
        .map(|f| {
            let start = f * TRIM_HOP;
            let end = (start + TRIM_FRAME).min(mono.len());
            let slice = &mono[start..end];
            (slice.iter().map(|s| s * s).sum::<f32>() / slice.len() as f32).sqrt()
        })
        .collect();

    let max_rms = rms.iter().copied().fold(0.0f32, f32::max);
    if max_rms <= 0.0 {
        return None;
    }

    let floor = max_rms * 10f32.powf(-threshold_db.abs() / 20.0);
    let first = rms.iter().position(|&r| r > floor)?;
    let last = rms.iter().rposition(|&r| r > floor)?;

    let start = first * TRIM_HOP;
    let end = (last * TRIM_HOP + TRIM_FRAME).min(buffer.len());
    if start >= end {
        return None;
    }

    Some(StereoBuffer::from_vec(buffer.as_slice()[start..end].to_vec()))
}

/// `tanh(x * drive) * ceiling` on both channels
fn soft_clip(buffer: &mut StereoBuffer, drive: f32, ceiling: f32) {
    for sample in buffer.iter_mut() {
        sample.left = (sample.left * drive).tanh() * ceiling;
        sample.right = (sample.right * drive).tanh() * ceiling;
    }
}

/// First-order high-pass: `y[n] = x[n] - coef * x[n-1]`
fn pre_emphasis(buffer: &mut StereoBuffer, coef: f32) {
    let mut previous = StereoSample::silence();
    for sample in buffer.iter_mut() {
        let current = *sample;
        sample.left = current.left - coef * previous.left;
        sample.right = current.right - coef * previous.right;
        previous = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sine_tone;

    const SR: u32 = 44100;

    #[test]
    fn test_silent_stem_is_noop_and_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("vocals.wav");
        let output = dir.path().join("enhanced_vocals.wav");
        write_wav(&input, &AudioClip::new(SR, StereoBuffer::silence(SR as usize))).unwrap();
        let before = std::fs::read(&input).unwrap();

        let outcome = enhance_file(&input, &output, EnhanceRole::Vocals, 30.0).unwrap();

        assert_eq!(outcome, EnhanceOutcome::NoOp);
        assert!(!output.exists());
        assert_eq!(std::fs::read(&input).unwrap(), before);
    }

    #[test]
    fn test_enhanced_file_written_next_to_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bass.wav");
        let output = dir.path().join("enhanced_bass.wav");
        write_wav(&input, &sine_tone(55.0, 0.3, 1.0, SR)).unwrap();

        let outcome = enhance_file(&input, &output, EnhanceRole::Bass, 30.0).unwrap();

        assert_eq!(outcome, EnhanceOutcome::Written(output.clone()));
        let enhanced = read_audio(&output).unwrap();
        assert!(enhanced.buffer.peak() <= 1.0);
        // Normalized then driven through tanh(1.2 * 1.4x) * 0.8
        assert!(enhanced.buffer.peak() > 0.7);
    }

    #[test]
    fn test_trim_removes_leading_silence() {
        let mut samples = vec![StereoSample::silence(); SR as usize];
        samples.extend(sine_tone(440.0, 0.5, 1.0, SR).buffer.iter().copied());
        let buffer = StereoBuffer::from_vec(samples);

        let trimmed = trim_silence(&buffer, 30.0).unwrap();

        assert!(trimmed.len() < buffer.len());
        assert!(trimmed.len() >= SR as usize);
    }

    #[test]
    fn test_every_role_stays_in_range() {
        let clip = sine_tone(220.0, 0.9, 0.5, SR);
        for role in [EnhanceRole::Vocals, EnhanceRole::Drums, EnhanceRole::Bass, EnhanceRole::Other] {
            let enhanced = enhance_clip(&clip, role, 30.0).unwrap();
            assert!(enhanced.buffer.peak() <= 1.0, "{} out of range", role.as_str());
        }
    }

    #[test]
    fn test_pre_emphasis_removes_dc() {
        let mut buffer = StereoBuffer::from_vec(vec![StereoSample::mono(1.0); 4]);
        pre_emphasis(&mut buffer, 1.0);
        assert_eq!(buffer[0], StereoSample::mono(1.0));
        assert_eq!(buffer[3], StereoSample::mono(0.0));
    }
}
