//! Time-stretching via signalsmith-stretch
//!
//! Wraps the signalsmith-stretch library to re-tempo stems offline without
//! changing their pitch. [`TimeStretcher`] is the block-level wrapper;
//! [`stretch_clip`] runs a whole clip through it with latency compensation,
//! and [`stretch_file`] adds tempo detection and the no-op copy path used by
//! fusion.

use std::path::{Path, PathBuf};

use signalsmith_stretch::Stretch;
use thiserror::Error;

use crate::analysis::{estimate_clip_bpm, BpmConfig, UNDETECTABLE_BPM};
use crate::audio_file::{read_audio, write_wav, AudioFileError};
use crate::types::{AudioClip, StereoBuffer};

/// Number of channels (stereo)
const CHANNELS: u32 = 2;

/// Input frames handed to the stretcher per call
const BLOCK_FRAMES: usize = 4096;

/// Slowest supported rate (output twice as long)
pub const MIN_RATE: f64 = 0.5;
/// Fastest supported rate (output half as long)
pub const MAX_RATE: f64 = 2.0;

/// Default tolerance below which a stretch becomes a plain copy
pub const DEFAULT_NO_OP_TOLERANCE: f64 = 0.01;

/// Errors raised by file-level stretching
#[derive(Error, Debug)]
pub enum StretchError {
    #[error("Tempo of {0} could not be detected")]
    TempoUndetectable(PathBuf),

    #[error("Invalid target tempo: {0}")]
    InvalidTarget(f64),

    #[error(transparent)]
    Audio(#[from] AudioFileError),

    #[error("Failed to copy {from} to {to}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StretchError>;

/// Time stretcher for tempo conversion
///
/// Takes stereo audio at the source tempo and outputs audio stretched or
/// compressed by `rate` (target_bpm / source_bpm).
///
/// Uses zero-copy format conversion - StereoBuffer is reinterpreted as
/// interleaved f32 without any per-frame copying.
pub struct TimeStretcher {
    /// The underlying signalsmith stretcher
    stretcher: Stretch,
    /// Current stretch rate (target_bpm / source_bpm)
    rate: f64,
}

impl TimeStretcher {
    /// Create a new time stretcher for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            stretcher: Stretch::preset_default(CHANNELS, sample_rate),
            rate: 1.0,
        }
    }

    /// Set the stretch rate
    ///
    /// rate > 1.0: speed up (fewer output samples per input)
    /// rate < 1.0: slow down (more output samples per input)
    pub fn set_rate(&mut self, rate: f64) {
        let clamped = rate.clamp(MIN_RATE, MAX_RATE);
        if (clamped - rate).abs() > f64::EPSILON {
            log::warn!(
                "TimeStretcher: rate {:.3} outside supported range, clamped to {:.3}",
                rate,
                clamped
            );
        }
        self.rate = clamped;
    }

    /// Get the current stretch rate
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Calculate stretch rate from BPMs
    pub fn rate_from_bpm(source_bpm: f64, target_bpm: f64) -> f64 {
        if source_bpm > 0.0 {
            target_bpm / source_bpm
        } else {
            1.0
        }
    }

    /// Get the input latency in frames
    pub fn input_latency(&self) -> usize {
        self.stretcher.input_latency()
    }

    /// Get the output latency in frames
    pub fn output_latency(&self) -> usize {
        self.stretcher.output_latency()
    }

    /// Reset the stretcher state
    pub fn reset(&mut self) {
        self.stretcher.reset();
    }

    /// Process one block
    ///
    /// The stretch applied is input_len / output_len; the caller sizes
    /// `output` accordingly.
    pub fn process(&mut self, input: &StereoBuffer, output: &mut StereoBuffer) {
        let output_interleaved = output.as_interleaved_mut();
        output_interleaved.fill(0.0);

        if input.is_empty() {
            return;
        }

        self.stretcher
            .process(input.as_interleaved(), output_interleaved);
    }

    /// Flush any remaining audio from the stretcher
    pub fn flush(&mut self, output: &mut StereoBuffer) {
        let output_interleaved = output.as_interleaved_mut();
        output_interleaved.fill(0.0);
        self.stretcher.flush(output_interleaved);
    }
}

/// Stretch a whole clip by `rate`
///
/// The result is latency compensated and exactly `round(frames / rate)`
/// frames long. Block output sizes are derived from cumulative input so
/// rounding never accumulates.
pub fn stretch_clip(clip: &AudioClip, rate: f64) -> AudioClip {
    let mut stretcher = TimeStretcher::new(clip.sample_rate);
    stretcher.set_rate(rate);
    let rate = stretcher.rate();

    let frames = clip.frames();
    let target_len = (frames as f64 / rate).round() as usize;
    if frames == 0 {
        return AudioClip::new(clip.sample_rate, StereoBuffer::default());
    }

    let in_latency = stretcher.input_latency();
    let out_latency = stretcher.output_latency();

    // Trailing silence pushes the tail of the signal through the input latency
    let mut padded = clip.buffer.clone();
    padded.resize(frames + in_latency);
    let padded = padded.as_slice();

    let mut rendered = StereoBuffer::with_capacity(target_len + in_latency * 2 + out_latency);
    let mut consumed = 0usize;
    let mut produced = 0usize;
    let mut block_out = StereoBuffer::default();

    while consumed < padded.len() {
        let end = (consumed + BLOCK_FRAMES).min(padded.len());
        let block_in = StereoBuffer::from_vec(padded[consumed..end].to_vec());
        consumed = end;

        let want = (consumed as f64 / rate).round() as usize;
        block_out.resize(want - produced);
        stretcher.process(&block_in, &mut block_out);
        produced = want;

        for sample in block_out.iter() {
            rendered.push(*sample);
        }
    }

    block_out.resize(out_latency);
    stretcher.flush(&mut block_out);
    for sample in block_out.iter() {
        rendered.push(*sample);
    }

    // Drop the leading latency, then pin the length
    let lead = (in_latency as f64 / rate).round() as usize + out_latency;
    let samples: Vec<_> = rendered.iter().skip(lead).copied().collect();
    let mut output = StereoBuffer::from_vec(samples);
    output.resize(target_len);

    log::debug!(
        "stretch_clip: {} -> {} frames at rate {:.4} (latency in={} out={})",
        frames,
        output.len(),
        rate,
        in_latency,
        out_latency
    );

    AudioClip::new(clip.sample_rate, output)
}

/// Options for [`stretch_file`]
#[derive(Debug, Clone)]
pub struct StretchOptions {
    /// Tempo range for source detection
    pub bpm: BpmConfig,
    /// |rate - 1| below this copies the file instead of stretching
    pub no_op_tolerance: f64,
}

impl Default for StretchOptions {
    fn default() -> Self {
        Self {
            bpm: BpmConfig::default(),
            no_op_tolerance: DEFAULT_NO_OP_TOLERANCE,
        }
    }
}

/// What [`stretch_file`] did
#[derive(Debug, Clone, PartialEq)]
pub struct StretchOutcome {
    /// Detected tempo of the input
    pub source_bpm: f64,
    /// Applied rate (1.0 for a copy)
    pub rate: f64,
    /// True if the input was copied verbatim
    pub copied: bool,
}

/// Re-tempo `input` to `target_bpm` and write the result to `output`
///
/// The input file is never modified. When the required rate is within
/// `no_op_tolerance` of 1 the output is a byte-identical copy.
pub fn stretch_file(
    input: &Path,
    output: &Path,
    target_bpm: f64,
    options: &StretchOptions,
) -> Result<StretchOutcome> {
    if !target_bpm.is_finite() || target_bpm <= 0.0 {
        return Err(StretchError::InvalidTarget(target_bpm));
    }

    let clip = read_audio(input)?;
    let source_bpm = estimate_clip_bpm(&clip, &options.bpm);
    if source_bpm == UNDETECTABLE_BPM {
        return Err(StretchError::TempoUndetectable(input.to_path_buf()));
    }

    let rate = TimeStretcher::rate_from_bpm(source_bpm, target_bpm);

    if (rate - 1.0).abs() < options.no_op_tolerance {
        log::info!(
            "Stretch: {:?} already at {:.2} BPM (target {:.2}), copying",
            input.file_name().unwrap_or_default(),
            source_bpm,
            target_bpm
        );
        std::fs::copy(input, output).map_err(|e| StretchError::Copy {
            from: input.to_path_buf(),
            to: output.to_path_buf(),
            source: e,
        })?;
        return Ok(StretchOutcome {
            source_bpm,
            rate: 1.0,
            copied: true,
        });
    }

    log::info!(
        "Stretch: {:?} {:.2} -> {:.2} BPM (rate {:.4})",
        input.file_name().unwrap_or_default(),
        source_bpm,
        target_bpm,
        rate
    );

    let stretched = stretch_clip(&clip, rate);
    write_wav(output, &stretched)?;

    Ok(StretchOutcome {
        source_bpm,
        rate: rate.clamp(MIN_RATE, MAX_RATE),
        copied: false,
    })
}
