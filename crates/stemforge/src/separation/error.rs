//! Separation error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a separation job
#[derive(Error, Debug)]
pub enum SeparationError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("Unsupported stem count: {0} (expected 4, 6 or 8)")]
    UnsupportedStemCount(u32),

    #[error("Failed to start separation engine '{program}'")]
    EngineSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Separation engine failed during {pass} (exit {code}): {message}")]
    EngineFailure {
        pass: String,
        code: String,
        message: String,
    },

    #[error("Output directory is in use by another job: {0}")]
    OutputBusy(PathBuf),

    #[error("Assembly incomplete, missing: {}", missing.join(", "))]
    AssemblyIncomplete { missing: Vec<String> },

    #[error("Failed to copy {from} to {to}")]
    Assembly {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SeparationError>;
