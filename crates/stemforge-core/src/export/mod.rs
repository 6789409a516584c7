//! MP3 export via LAME (mp3lame-encoder)

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::AudioClip;

/// Bitrate fusion mixes are exported at
pub const DEFAULT_BITRATE_KBPS: u32 = 320;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("MP3 encoding failed: {0}")]
    Encode(String),

    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Map a requested bitrate onto the nearest LAME constant at or below it
fn lame_bitrate(kbps: u32) -> mp3lame_encoder::Bitrate {
    use mp3lame_encoder::Bitrate;
    match kbps {
        0..=111 => Bitrate::Kbps96,
        112..=127 => Bitrate::Kbps112,
        128..=159 => Bitrate::Kbps128,
        160..=191 => Bitrate::Kbps160,
        192..=223 => Bitrate::Kbps192,
        224..=255 => Bitrate::Kbps224,
        256..=319 => Bitrate::Kbps256,
        _ => Bitrate::Kbps320,
    }
}

/// Encode a stereo clip to MP3 bytes
pub fn encode_mp3(clip: &AudioClip, bitrate_kbps: u32) -> Result<Vec<u8>> {
    use mp3lame_encoder::{Builder, DualPcm, FlushNoGap, Quality};

    let mut builder =
        Builder::new().ok_or_else(|| ExportError::Encode("LAME encoder init failed".to_string()))?;

    builder
        .set_num_channels(2)
        .map_err(|e| ExportError::Encode(format!("set channels: {:?}", e)))?;
    builder
        .set_sample_rate(clip.sample_rate)
        .map_err(|e| ExportError::Encode(format!("set sample rate: {:?}", e)))?;
    builder
        .set_brate(lame_bitrate(bitrate_kbps))
        .map_err(|e| ExportError::Encode(format!("set bitrate: {:?}", e)))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| ExportError::Encode(format!("set quality: {:?}", e)))?;

    let mut encoder = builder
        .build()
        .map_err(|e| ExportError::Encode(format!("build: {:?}", e)))?;

    // LAME expects 16-bit PCM
    let to_i16 = |s: f32| (s.clamp(-1.0, 1.0) * 32767.0) as i16;
    let (left, right): (Vec<i16>, Vec<i16>) = clip
        .buffer
        .iter()
        .map(|s| (to_i16(s.left), to_i16(s.right)))
        .unzip();

    let mut mp3 = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(left.len()));

    let encoded = encoder
        .encode(
            DualPcm {
                left: &left,
                right: &right,
            },
            mp3.spare_capacity_mut(),
        )
        .map_err(|e| ExportError::Encode(format!("encode: {:?}", e)))?;

    // SAFETY: encoder wrote `encoded` bytes into spare capacity
    unsafe {
        mp3.set_len(encoded);
    }

    mp3.reserve(7200);
    let flushed = encoder
        .flush::<FlushNoGap>(mp3.spare_capacity_mut())
        .map_err(|e| ExportError::Encode(format!("flush: {:?}", e)))?;

    // SAFETY: encoder wrote `flushed` bytes into spare capacity
    unsafe {
        mp3.set_len(mp3.len() + flushed);
    }

    Ok(mp3)
}

/// Encode a clip and write it to `path`
pub fn export_mp3(path: &Path, clip: &AudioClip, bitrate_kbps: u32) -> Result<()> {
    let bytes = encode_mp3(clip, bitrate_kbps)?;
    std::fs::write(path, &bytes).map_err(|e| ExportError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    log::info!(
        "Exported {:.1}s of audio to {:?} ({} kbps, {} bytes)",
        clip.duration_secs(),
        path,
        bitrate_kbps,
        bytes.len()
    );
    Ok(())
}
