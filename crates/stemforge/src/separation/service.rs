//! Separation service - owns the job registry and starts separation runs
//!
//! The `SeparationService` is the main entry point for stem separation.
//! It handles:
//! - Request defaults from [`SeparationConfig`]
//! - Job registry ownership and cancellation
//! - Output claims for concurrently running jobs
//! - Stem listing for finished jobs

use std::path::Path;
use std::sync::Arc;

use super::artifacts::{collect_artifacts, SeparationRecord, StemArtifact};
use super::claims::ClaimSet;
use super::config::SeparationConfig;
use super::error::Result;
use super::pipeline::{RunContext, SeparationRequest, SeparationRun};
use super::plan::{ComponentPlan, StemCount};
use super::progress::ProgressRelay;
use super::registry::JobRegistry;

/// Main service for stem separation
///
/// Example usage:
/// ```ignore
/// let service = SeparationService::with_config(config);
/// for event in service.separate(service.request("song.mp3")) {
///     println!("{}", event.wire_line());
/// }
/// ```
pub struct SeparationService {
    config: SeparationConfig,
    registry: Arc<JobRegistry>,
    claims: Arc<ClaimSet>,
}

impl SeparationService {
    /// Create a new separation service with default config
    pub fn new() -> Self {
        Self::with_config(SeparationConfig::default())
    }

    /// Create a separation service with custom config
    pub fn with_config(mut config: SeparationConfig) -> Self {
        config.validate();
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            claims: Arc::new(ClaimSet::new()),
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &SeparationConfig {
        &self.config
    }

    /// Registry shared by every run this service starts
    pub fn registry(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.registry)
    }

    /// A request for `input` filled in from the configured defaults
    pub fn request(&self, input: impl AsRef<Path>) -> SeparationRequest {
        SeparationRequest {
            input: input.as_ref().to_path_buf(),
            output_root: self.config.output_root.clone(),
            model: self.config.model.clone(),
            device: self.config.device.clone(),
            stem_count: self.config.stem_count,
            enhance: self.config.enhance,
            silence_threshold_db: self.config.silence_threshold_db,
        }
    }

    /// Start a separation driven by the caller's iteration
    ///
    /// Nothing runs until the first event is pulled. Invalid requests
    /// surface as a single `Error` event.
    pub fn separate(&self, request: SeparationRequest) -> SeparationRun {
        SeparationRun::new(
            request,
            RunContext {
                engine: self.config.engine.clone(),
                high_quality_model: self.config.high_quality_model.clone(),
                registry: self.registry(),
                claims: Arc::clone(&self.claims),
            },
        )
    }

    /// Start a separation on a worker thread
    pub fn spawn(&self, request: SeparationRequest) -> std::io::Result<ProgressRelay> {
        let run = self.separate(request);
        ProgressRelay::spawn(run, self.config.progress_capacity)
    }

    /// Kill the engine process registered under `job_key`
    ///
    /// Second-pass splits run under `"<job_key>:<target>"` and must be
    /// cancelled by that key.
    pub fn cancel(&self, job_key: &str) -> bool {
        self.registry.cancel(job_key)
    }

    pub fn is_running(&self, job_key: &str) -> bool {
        self.registry.contains(job_key)
    }

    /// Stems of a finished job, as they exist on disk
    ///
    /// `model` is the model the job was started with; 8-stem jobs ignore it.
    pub fn list_stems(&self, job_key: &str, model: &str, stem_count: u32) -> Result<Vec<StemArtifact>> {
        let plan = ComponentPlan::for_count(stem_count)?;
        let model = plan.effective_model(model, &self.config.high_quality_model);
        let dir = plan.canonical_dir(&self.config.output_root, model, job_key);
        Ok(collect_artifacts(plan, &self.config.output_root, &dir))
    }

    /// Rebuild the record of an earlier job from the output layout
    pub fn record_for(&self, input: &Path, model: &str, stem_count: u32) -> Result<SeparationRecord> {
        let count = StemCount::try_from(stem_count)?;
        let model = count
            .plan()
            .effective_model(model, &self.config.high_quality_model);
        Ok(SeparationRecord::from_layout(
            input,
            &self.config.output_root,
            model,
            count,
        ))
    }
}

impl Default for SeparationService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::separation::error::SeparationError;
    use crate::separation::progress::ProgressEvent;
    use crate::test_support::{fake_engine, hanging_engine};
    use stemforge_core::audio_file::write_wav;
    use stemforge_core::testing::click_track;

    fn service(dir: &Path, engine: crate::separation::EngineConfig) -> SeparationService {
        SeparationService::with_config(SeparationConfig {
            engine,
            output_root: dir.join("out"),
            model: "engineA".to_string(),
            enhance: false,
            ..Default::default()
        })
    }

    fn input(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("f00d_track.wav");
        write_wav(&path, &click_track(120.0, 2.0, 44100)).unwrap();
        path
    }

    #[test]
    fn test_spawned_run_completes_and_lists_stems() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), fake_engine());
        let relay = service.spawn(service.request(input(dir.path()))).unwrap();

        let events: Vec<ProgressEvent> = relay.collect();
        match events.last().unwrap() {
            ProgressEvent::Complete {
                job_key,
                original_name,
                ..
            } => {
                assert_eq!(job_key, "f00d_track");
                assert_eq!(original_name, "track.wav");
            }
            other => panic!("expected Complete, got {:?}", other),
        }

        let stems = service.list_stems("f00d_track", "engineA", 4).unwrap();
        let names: Vec<&str> = stems.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(names, vec!["Vocals", "Drums", "Bass", "Other"]);
        assert_eq!(
            stems[0].relative_path,
            std::path::PathBuf::from("engineA/f00d_track/vocals.wav")
        );
    }

    #[test]
    fn test_cancel_through_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), hanging_engine());
        let mut relay = service.spawn(service.request(input(dir.path()))).unwrap();

        for event in relay.by_ref() {
            if event == ProgressEvent::Line("started".to_string()) {
                break;
            }
        }
        assert!(service.is_running("f00d_track"));
        assert!(service.cancel("f00d_track"));

        let last = relay.last().unwrap();
        assert_eq!(
            last,
            ProgressEvent::Cancelled {
                job_key: "f00d_track".to_string()
            }
        );
        assert!(!service.is_running("f00d_track"));
        assert!(!service.cancel("f00d_track"));
    }

    #[test]
    fn test_list_stems_rejects_unknown_count() {
        let service = SeparationService::new();
        assert!(matches!(
            service.list_stems("x", "htdemucs", 3),
            Err(SeparationError::UnsupportedStemCount(3))
        ));
    }

    #[test]
    fn test_record_for_eight_stems_uses_pinned_model() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), fake_engine());
        let record = service
            .record_for(Path::new("/in/song.wav"), "engineA", 8)
            .unwrap();
        assert_eq!(record.model, "htdemucs_ft");
        assert!(record.stems.is_empty());
    }
}
