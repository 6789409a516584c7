//! Tempo analysis
//!
//! Pure-Rust BPM detection: an onset-strength envelope ([`onset`]) fed into
//! an autocorrelation tempo picker ([`tempo`]).

pub mod onset;
pub mod tempo;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio_file::{read_audio, AudioFileError};

pub use tempo::{estimate_bpm, estimate_clip_bpm, UNDETECTABLE_BPM};

/// BPM detection configuration
///
/// - min_tempo: minimum expected BPM (40-180)
/// - max_tempo: maximum expected BPM (60-250)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BpmConfig {
    /// Minimum expected tempo in BPM (range: 40-180)
    pub min_tempo: i32,
    /// Maximum expected tempo in BPM (range: 60-250)
    pub max_tempo: i32,
}

impl Default for BpmConfig {
    fn default() -> Self {
        Self {
            min_tempo: 40,
            max_tempo: 208,
        }
    }
}

impl BpmConfig {
    /// Validate and clamp values to the supported ranges
    pub fn validate(&mut self) {
        self.min_tempo = self.min_tempo.clamp(40, 180);
        self.max_tempo = self.max_tempo.clamp(60, 250);

        // Ensure min < max with at least 20 BPM gap
        if self.min_tempo >= self.max_tempo {
            self.max_tempo = (self.min_tempo + 20).min(250);
        }
    }

    /// Create config for a specific genre (e.g., DnB: 160-190)
    pub fn for_range(min: i32, max: i32) -> Self {
        let mut config = Self {
            min_tempo: min,
            max_tempo: max,
        };
        config.validate();
        config
    }
}

/// Decode a file and estimate its tempo
///
/// Decoding failures are errors; an undetectable tempo is `Ok(0.0)`.
pub fn estimate_file_bpm(path: &Path, config: &BpmConfig) -> Result<f64, AudioFileError> {
    let clip = read_audio(path)?;
    let bpm = estimate_clip_bpm(&clip, config);
    log::info!("Tempo of {:?}: {:.2} BPM", path.file_name().unwrap_or_default(), bpm);
    Ok(bpm)
}
