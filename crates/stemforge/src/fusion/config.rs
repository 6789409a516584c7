//! Fusion configuration types

use serde::{Deserialize, Serialize};

use stemforge_core::export::DEFAULT_BITRATE_KBPS;
use stemforge_core::timestretch::DEFAULT_NO_OP_TOLERANCE;

/// Configuration for stem fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// MP3 bitrate of the fused track
    pub bitrate_kbps: u32,

    /// Stems whose rate is within this of 1.0 are copied, not stretched
    pub no_op_tolerance: f64,

    /// Directory under the output root holding per-request scratch dirs
    pub scratch_dir_name: String,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            no_op_tolerance: DEFAULT_NO_OP_TOLERANCE,
            scratch_dir_name: "fusion_temp".to_string(),
        }
    }
}

impl FusionConfig {
    /// Validate configuration values
    pub fn validate(&mut self) {
        self.bitrate_kbps = self.bitrate_kbps.clamp(96, 320);
        self.no_op_tolerance = self.no_op_tolerance.clamp(0.0, 0.1);
        if self.scratch_dir_name.trim().is_empty() {
            self.scratch_dir_name = Self::default().scratch_dir_name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps() {
        let mut config = FusionConfig {
            bitrate_kbps: 1000,
            no_op_tolerance: 0.5,
            scratch_dir_name: " ".to_string(),
        };
        config.validate();
        assert_eq!(config.bitrate_kbps, 320);
        assert_eq!(config.no_op_tolerance, 0.1);
        assert_eq!(config.scratch_dir_name, "fusion_temp");
    }
}
