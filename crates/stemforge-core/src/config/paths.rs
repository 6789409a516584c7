//! Default locations for configuration and separated stems

use std::path::PathBuf;

/// Name of the config file inside [`default_config_dir`]
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Returns: `~/.config/stemforge` (platform config dir)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stemforge")
}

/// Returns: `~/.config/stemforge/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

/// Root under which separation output trees are created
///
/// Returns: `~/Music/stemforge`
pub fn default_output_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Music")
        .join("stemforge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_root_ends_with_stemforge() {
        assert!(default_output_root().ends_with("Music/stemforge"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path();
        assert!(path.ends_with("stemforge/config.yaml"));
    }
}
