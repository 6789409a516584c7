//! Fusion error types

use std::path::PathBuf;
use thiserror::Error;

use stemforge_core::audio_file::AudioFileError;
use stemforge_core::export::ExportError;

/// Errors that abort a whole fusion request
///
/// Problems with a single role (missing stem, failed stretch) do not appear
/// here; the role is skipped and reported in the
/// [`FusionReport`](super::FusionReport).
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("No separation record for job {0}")]
    UnknownJob(String),

    #[error("Failed to read master input {path}")]
    MasterAudio {
        path: PathBuf,
        #[source]
        source: AudioFileError,
    },

    #[error("Tempo of master job {0} could not be detected")]
    TempoUndetectable(String),

    #[error("Nothing to fuse: every role was muted, unassigned or skipped")]
    NothingToFuse,

    #[error("Failed to create fusion scratch directory {path}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Audio(#[from] AudioFileError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, FusionError>;
