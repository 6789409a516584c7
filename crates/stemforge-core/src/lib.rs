//! Stemforge Core - Audio primitives for stem separation and fusion

pub mod analysis;
pub mod audio_file;
pub mod config;
pub mod enhance;
pub mod export;
pub mod timestretch;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use types::*;
