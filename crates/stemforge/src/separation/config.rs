//! Separation configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use stemforge_core::config::default_output_root;
use stemforge_core::enhance::DEFAULT_SILENCE_THRESHOLD_DB;

/// How to launch the external separation engine
///
/// The final command line is
/// `<program> <args…> -n <model> -d <device> -o <out> [--two-stems <target>] <input>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable to spawn
    pub program: String,
    /// Arguments placed before the per-run arguments
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["-m".to_string(), "demucs".to_string()],
        }
    }
}

/// Configuration for stem separation jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// External engine invocation
    pub engine: EngineConfig,

    /// Root under which all output trees are created
    pub output_root: PathBuf,

    /// Default engine model
    pub model: String,

    /// Model every 8-stem job is pinned to
    pub high_quality_model: String,

    /// Compute device handed to the engine (cpu, cuda, mps)
    pub device: String,

    /// Default stem count (4, 6 or 8)
    pub stem_count: u32,

    /// Run the enhancement post-filter after assembly
    pub enhance: bool,

    /// Silence-trim threshold for enhancement, in dB below peak
    pub silence_threshold_db: f32,

    /// Capacity of the progress channel between a worker and its consumer
    pub progress_capacity: usize,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            output_root: default_output_root(),
            model: "htdemucs".to_string(),
            high_quality_model: "htdemucs_ft".to_string(),
            device: "cpu".to_string(),
            stem_count: 4,
            enhance: true,
            silence_threshold_db: DEFAULT_SILENCE_THRESHOLD_DB,
            progress_capacity: 64,
        }
    }
}

impl SeparationConfig {
    /// Validate configuration values
    pub fn validate(&mut self) {
        if !matches!(self.stem_count, 4 | 6 | 8) {
            log::warn!(
                "SeparationConfig: unsupported stem count {}, using 4",
                self.stem_count
            );
            self.stem_count = 4;
        }
        self.silence_threshold_db = self.silence_threshold_db.abs().clamp(1.0, 120.0);
        self.progress_capacity = self.progress_capacity.clamp(1, 4096);
        if self.engine.program.trim().is_empty() {
            self.engine = EngineConfig::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SeparationConfig::default();
        assert_eq!(config.model, "htdemucs");
        assert_eq!(config.high_quality_model, "htdemucs_ft");
        assert_eq!(config.stem_count, 4);
        assert_eq!(config.engine.args, vec!["-m", "demucs"]);
    }

    #[test]
    fn test_validate_repairs_bad_values() {
        let mut config = SeparationConfig {
            stem_count: 5,
            silence_threshold_db: -500.0,
            progress_capacity: 0,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.stem_count, 4);
        assert_eq!(config.silence_threshold_db, 120.0);
        assert_eq!(config.progress_capacity, 1);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: SeparationConfig = serde_yaml::from_str("device: cuda\nstem_count: 8\n").unwrap();
        assert_eq!(config.device, "cuda");
        assert_eq!(config.stem_count, 8);
        assert_eq!(config.model, "htdemucs");
    }
}
