//! Global configuration for stemforge
//!
//! Stored as YAML in the user config directory.
//! Default location: ~/.config/stemforge/config.yaml

use serde::{Deserialize, Serialize};
use std::path::Path;

use stemforge_core::analysis::BpmConfig;
use stemforge_core::config::{load_config, load_config_strict};

use crate::fusion::FusionConfig;
use crate::separation::SeparationConfig;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemforgeConfig {
    /// Engine invocation and separation defaults
    pub separation: SeparationConfig,
    /// Fusion export settings
    pub fusion: FusionConfig,
    /// Tempo range for BPM detection during fusion
    pub bpm: BpmConfig,
}

impl StemforgeConfig {
    /// Validate every section
    pub fn validate(&mut self) {
        self.separation.validate();
        self.fusion.validate();
        self.bpm.validate();
    }

    /// Load from `path`, falling back to defaults, and validate
    pub fn load(path: &Path) -> Self {
        let mut config: Self = load_config(path);
        config.validate();
        config
    }

    /// Load from a file the user named explicitly
    pub fn load_strict(path: &Path) -> anyhow::Result<Self> {
        let mut config: Self = load_config_strict(path)?;
        config.validate();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stemforge_core::config::save_config;

    #[test]
    fn test_default_config() {
        let config = StemforgeConfig::default();
        assert_eq!(config.separation.stem_count, 4);
        assert_eq!(config.fusion.bitrate_kbps, 320);
        assert_eq!(config.bpm.min_tempo, 40);
        assert_eq!(config.bpm.max_tempo, 208);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = "separation:\n  model: mdx_extra\n  stem_count: 8\nbpm:\n  min_tempo: 160\n  max_tempo: 190\n";
        let config: StemforgeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.separation.model, "mdx_extra");
        assert_eq!(config.separation.stem_count, 8);
        assert_eq!(config.separation.device, "cpu");
        assert_eq!(config.bpm.min_tempo, 160);
        assert_eq!(config.fusion, FusionConfig::default());
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "separation:\n  stem_count: 5\nbpm:\n  min_tempo: 10\n").unwrap();

        let config = StemforgeConfig::load(&path);
        assert_eq!(config.separation.stem_count, 4);
        assert_eq!(config.bpm.min_tempo, 40);
    }

    #[test]
    fn test_strict_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "separation: [not, a, map").unwrap();

        assert!(StemforgeConfig::load_strict(&path).is_err());
        assert_eq!(StemforgeConfig::load(&path), StemforgeConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = StemforgeConfig::default();
        config.separation.enhance = false;
        config.fusion.bitrate_kbps = 192;

        save_config(&config, &path).unwrap();
        assert_eq!(StemforgeConfig::load_strict(&path).unwrap(), config);
    }
}
