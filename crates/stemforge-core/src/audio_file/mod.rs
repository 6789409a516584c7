//! Audio file reading and writing
//!
//! - [`read_audio`] decodes anything Symphonia understands (WAV, FLAC, MP3,
//!   AAC/M4A, OGG) into a stereo [`AudioClip`].
//! - [`write_wav`] writes a clip as 32-bit float stereo WAV, the format the
//!   time-stretcher and enhancement filter hand back to the pipeline.
//! - [`resample`] converts a clip to another sample rate with rubato.

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{AudioClip, StereoBuffer, StereoSample};

/// Errors raised while reading, writing or converting audio
#[derive(Error, Debug)]
pub enum AudioFileError {
    #[error("Failed to open audio file: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported audio format in {path}: {reason}")]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Failed to write WAV file {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Resampling failed: {0}")]
    Resample(String),
}

pub type Result<T> = std::result::Result<T, AudioFileError>;

/// Decode an audio file into a stereo clip using Symphonia
///
/// Mono sources are duplicated to both channels; sources with more than two
/// channels keep the first two.
pub fn read_audio(path: &Path) -> Result<AudioClip> {
    use symphonia::core::audio::SampleBuffer;
    use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let unsupported = |reason: String| AudioFileError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| AudioFileError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| unsupported(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| unsupported("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| unsupported("Unknown sample rate".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(2)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| unsupported(e.to_string()))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("read_audio: error reading packet from {:?}: {}", path, e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("read_audio: error decoding packet from {:?}: {}", path, e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    let buffer = to_stereo(&interleaved, channels);

    log::debug!(
        "read_audio: {:?} -> {} frames, {} Hz, {} source channel(s)",
        path,
        buffer.len(),
        sample_rate,
        channels
    );

    Ok(AudioClip::new(sample_rate, buffer))
}

/// Fold interleaved N-channel audio into a stereo buffer
fn to_stereo(interleaved: &[f32], channels: usize) -> StereoBuffer {
    match channels {
        1 => StereoBuffer::from_vec(interleaved.iter().map(|&s| StereoSample::mono(s)).collect()),
        2 => StereoBuffer::from_interleaved(interleaved),
        n => StereoBuffer::from_vec(
            interleaved
                .chunks_exact(n)
                .map(|frame| StereoSample::new(frame[0], frame[1]))
                .collect(),
        ),
    }
}

/// Write a clip as a 32-bit float stereo WAV file
pub fn write_wav(path: &Path, clip: &AudioClip) -> Result<()> {
    use hound::{SampleFormat, WavSpec, WavWriter};

    let write_err = |reason: String| AudioFileError::Write {
        path: path.to_path_buf(),
        reason,
    };

    let spec = WavSpec {
        channels: 2,
        sample_rate: clip.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| write_err(e.to_string()))?;
    for &sample in clip.buffer.as_interleaved() {
        writer
            .write_sample(sample)
            .map_err(|e| write_err(e.to_string()))?;
    }
    writer.finalize().map_err(|e| write_err(e.to_string()))?;

    log::debug!("write_wav: wrote {} frames to {:?}", clip.frames(), path);
    Ok(())
}

/// Resample a clip to `target_rate`
///
/// Returns a clone when the clip is already at the target rate.
pub fn resample(clip: &AudioClip, target_rate: u32) -> Result<AudioClip> {
    use rubato::{FastFixedIn, PolynomialDegree, Resampler};

    if clip.sample_rate == target_rate || clip.buffer.is_empty() {
        return Ok(AudioClip::new(target_rate, clip.buffer.clone()));
    }

    log::debug!(
        "resample: {} Hz -> {} Hz ({} frames)",
        clip.sample_rate,
        target_rate,
        clip.frames()
    );

    let (left, right) = clip.buffer.to_channels();
    let input_frames = left.len();

    let mut resampler = FastFixedIn::<f32>::new(
        target_rate as f64 / clip.sample_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input_frames,
        2,
    )
    .map_err(|e| AudioFileError::Resample(e.to_string()))?;

    let planar = resampler
        .process(&[left, right], None)
        .map_err(|e| AudioFileError::Resample(e.to_string()))?;

    let buffer = StereoBuffer::from_channels(&planar[0], &planar[1]);
    Ok(AudioClip::new(target_rate, buffer))
}
