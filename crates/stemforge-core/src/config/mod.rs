//! Shared configuration utilities
//!
//! Generic YAML loading/saving for any serde config type, plus the default
//! locations stemforge front ends read from and write to.
//!
//! # Usage
//!
//! ```ignore
//! use stemforge_core::config::{load_config, save_config, default_config_path};
//!
//! let config: AppConfig = load_config(&default_config_path());
//! save_config(&config, &default_config_path())?;
//! ```

mod io;
mod paths;

pub use io::{load_config, load_config_strict, save_config};
pub use paths::{default_config_dir, default_config_path, default_output_root, CONFIG_FILE_NAME};
