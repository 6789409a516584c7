//! Tempo-synchronized fusion of stems from different separations
//!
//! ```text
//! FusionRequest ──► master BPM ──► per role: copy | stretch ──► mix ──► MP3
//!                                  (scratch dir, removed after)
//! ```

mod config;
mod error;
mod mixer;
mod request;
mod service;

pub use config::FusionConfig;
pub use error::FusionError;
pub use mixer::{mix, MixInput};
pub use request::{FusionReport, FusionRequest, MixedTrack, RoleAssignment, RoleOutcome, RoleReport};
pub use service::FusionService;
