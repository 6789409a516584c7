//! Multi-pass stem separation around an external engine
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SeparationService                      │
//! │  • Owns the JobRegistry and output claims               │
//! │  • Builds requests from config, lists finished stems    │
//! └─────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │        SeparationRun (Iterator<Item = ProgressEvent>)   │
//! │  • ComponentPlan per stem count (4 / 6 / 8)             │
//! │  • Pass 1, pass-2 splits, assembly, enhancement         │
//! └─────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │        EngineRun (Iterator<Item = Result<String>>)      │
//! │  • One engine subprocess, registered while alive        │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod artifacts;
mod claims;
mod config;
mod engine;
mod error;
mod pipeline;
mod plan;
mod progress;
mod registry;
mod service;

pub use artifacts::{job_key_for, original_name, SeparationRecord, StemArtifact, ENHANCED_PREFIX};
pub use claims::{ClaimSet, OutputClaim};
pub use config::{EngineConfig, SeparationConfig};
pub use engine::{EngineRequest, EngineRun};
pub use error::SeparationError;
pub use pipeline::{SeparationRequest, SeparationRun};
pub use plan::{ComponentPlan, SplitSpec, StemCount, StemSpec};
pub use progress::{ProgressEvent, ProgressRelay};
pub use registry::{derived_key, JobRegistry, ProcessHandle};
pub use service::SeparationService;
