//! Multi-pass separation pipeline
//!
//! ```text
//! Init → Pass1 → [Pass2 split …] → Assemble → [Enhance] → Finish
//!   └──────────────┴───────────────────┴──────────┴──→ Error / Cancelled
//! ```
//!
//! [`SeparationRun`] is an iterator of [`ProgressEvent`]s. Each call to
//! `next` advances the state machine until it has an event to hand out, so
//! the engine only makes progress while somebody is consuming. The last
//! event is always terminal.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stemforge_core::enhance::{enhance_file, EnhanceOutcome};

use super::artifacts::{collect_artifacts, enhanced_file_name, job_key_for, original_name, SeparationRecord};
use super::claims::{ClaimSet, OutputClaim};
use super::config::EngineConfig;
use super::engine::{EngineRequest, EngineRun};
use super::error::SeparationError;
use super::plan::{ComponentPlan, SplitSpec, StemSpec};
use super::progress::ProgressEvent;
use super::registry::{derived_key, JobRegistry};

/// Parameters of one separation job
#[derive(Debug, Clone, PartialEq)]
pub struct SeparationRequest {
    pub input: PathBuf,
    pub output_root: PathBuf,
    pub model: String,
    pub device: String,
    /// 4, 6 or 8; anything else ends the run with an error
    pub stem_count: u32,
    pub enhance: bool,
    /// Silence-trim threshold for enhancement, dB below peak
    pub silence_threshold_db: f32,
}

impl SeparationRequest {
    pub fn job_key(&self) -> String {
        job_key_for(&self.input)
    }
}

/// Shared pieces a run needs from its service
pub(crate) struct RunContext {
    pub engine: EngineConfig,
    pub high_quality_model: String,
    pub registry: Arc<JobRegistry>,
    pub claims: Arc<ClaimSet>,
}

enum State {
    Init,
    Pass1(EngineRun),
    Pass2 {
        queue: VecDeque<&'static SplitSpec>,
        current: Option<(&'static SplitSpec, EngineRun)>,
    },
    Assemble,
    Enhance(VecDeque<&'static StemSpec>),
    Finish,
    Done,
}

/// One separation job, driven by iteration
pub struct SeparationRun {
    request: SeparationRequest,
    context: RunContext,
    job_key: String,
    state: State,
    pending: VecDeque<ProgressEvent>,
    plan: Option<&'static ComponentPlan>,
    model: String,
    claim: Option<OutputClaim>,
    /// Splits whose engine run finished in this run
    completed_splits: Vec<&'static SplitSpec>,
}

impl SeparationRun {
    pub(crate) fn new(request: SeparationRequest, context: RunContext) -> Self {
        let job_key = request.job_key();
        let model = request.model.clone();
        Self {
            request,
            context,
            job_key,
            state: State::Init,
            pending: VecDeque::new(),
            plan: None,
            model,
            claim: None,
            completed_splits: Vec::new(),
        }
    }

    pub fn job_key(&self) -> &str {
        &self.job_key
    }

    /// Model the engine runs with (differs from the request for 8 stems)
    pub fn model(&self) -> &str {
        &self.model
    }

    fn emit(&mut self, event: ProgressEvent) {
        self.pending.push_back(event);
    }

    fn milestone(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::info!("[SEPARATION] {}: {}", self.job_key, text);
        self.emit(ProgressEvent::Milestone(text));
    }

    fn notice(&mut self, text: impl Into<String>) {
        let text = text.into();
        log::warn!("[SEPARATION] {}: {}", self.job_key, text);
        self.emit(ProgressEvent::Notice(text));
    }

    fn fail(&mut self, error: SeparationError) {
        log::error!("[SEPARATION] {} failed: {}", self.job_key, error);
        self.state = State::Done;
        self.claim = None;
        self.emit(ProgressEvent::Error {
            message: error.to_string(),
        });
    }

    fn cancelled(&mut self) {
        log::info!("[SEPARATION] {} cancelled", self.job_key);
        self.state = State::Done;
        self.claim = None;
        self.emit(ProgressEvent::Cancelled {
            job_key: self.job_key.clone(),
        });
    }

    fn plan(&self) -> &'static ComponentPlan {
        // Set in Init before any other state is reachable
        self.plan.unwrap_or(&super::plan::FOUR_STEM_PLAN)
    }

    fn pass1_dir(&self) -> PathBuf {
        self.plan()
            .pass1_dir(&self.request.output_root, &self.model, &self.job_key)
    }

    fn canonical_dir(&self) -> PathBuf {
        self.plan()
            .canonical_dir(&self.request.output_root, &self.model, &self.job_key)
    }

    /// Advance one step; may queue zero or more events
    fn step(&mut self) {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Init => self.init(),
            State::Pass1(run) => self.pass1(run),
            State::Pass2 { queue, current } => self.pass2(queue, current),
            State::Assemble => self.assemble(),
            State::Enhance(queue) => self.enhance(queue),
            State::Finish => self.finish(),
            State::Done => {}
        }
    }

    fn init(&mut self) {
        let plan = match ComponentPlan::for_count(self.request.stem_count) {
            Ok(plan) => plan,
            Err(e) => return self.fail(e),
        };
        self.plan = Some(plan);

        if !self.request.input.is_file() {
            return self.fail(SeparationError::InputNotFound(self.request.input.clone()));
        }

        match self
            .context
            .claims
            .claim(&self.request.output_root, &self.job_key)
        {
            Ok(claim) => self.claim = Some(claim),
            Err(e) => return self.fail(e),
        }

        if let Err(e) = std::fs::create_dir_all(&self.request.output_root) {
            return self.fail(SeparationError::Io(e));
        }

        self.model = plan
            .effective_model(&self.request.model, &self.context.high_quality_model)
            .to_string();

        // Pass 1 must not pick up stems an earlier run of this job left behind
        let pass1 = self.pass1_dir();
        for stem in plan.base_stems {
            for file in [stem.file.to_string(), enhanced_file_name(stem.file)] {
                if let Err(e) = remove_file_if_exists(&pass1.join(file)) {
                    return self.fail(SeparationError::Io(e));
                }
            }
        }

        let name = self
            .request
            .input
            .file_name()
            .map(|s| original_name(&s.to_string_lossy()))
            .unwrap_or_default();
        self.milestone(format!(
            "Starting {}-stem separation of {} (model {}, device {})",
            plan.stem_count, name, self.model, self.request.device
        ));
        if self.model != self.request.model {
            self.milestone(format!(
                "{}-stem separation always uses {}",
                plan.stem_count, self.model
            ));
        }

        let request = EngineRequest {
            input: self.request.input.clone(),
            output_root: self.request.output_root.clone(),
            model: self.model.clone(),
            device: self.request.device.clone(),
            two_stems: None,
            job_key: self.job_key.clone(),
        };
        match EngineRun::spawn(&self.context.engine, request, self.context.registry.clone()) {
            Ok(run) => self.state = State::Pass1(run),
            Err(e) => self.fail(e),
        }
    }

    fn pass1(&mut self, mut run: EngineRun) {
        match run.next() {
            Some(Ok(line)) => {
                self.emit(ProgressEvent::Line(line));
                self.state = State::Pass1(run);
            }
            Some(Err(e)) => self.fail(e),
            None if run.was_cancelled() => self.cancelled(),
            None => {
                self.milestone("Pass 1 complete");
                let splits = self.plan().splits;
                self.state = if splits.is_empty() {
                    State::Assemble
                } else {
                    State::Pass2 {
                        queue: splits.iter().collect(),
                        current: None,
                    }
                };
            }
        }
    }

    fn pass2(
        &mut self,
        mut queue: VecDeque<&'static SplitSpec>,
        current: Option<(&'static SplitSpec, EngineRun)>,
    ) {
        let Some((split, mut run)) = current else {
            let Some(split) = queue.pop_front() else {
                self.state = State::Assemble;
                return;
            };

            let source = self.pass1_dir().join(split.source_file());
            if !source.is_file() {
                self.notice(format!(
                    "Skipping {} split: {} was not produced",
                    split.target,
                    split.source_file()
                ));
                self.state = State::Pass2 {
                    queue,
                    current: None,
                };
                return;
            }

            let scratch_root = split.job_scratch_root(&self.request.output_root, &self.job_key);
            if let Err(e) = clear_dir(&scratch_root) {
                return self.fail(SeparationError::Io(e));
            }

            self.milestone(format!("Splitting {} with two-stems", split.target));
            let request = EngineRequest {
                input: source,
                output_root: scratch_root,
                model: self.model.clone(),
                device: self.request.device.clone(),
                two_stems: Some(split.target.to_string()),
                job_key: derived_key(&self.job_key, split.target),
            };
            match EngineRun::spawn(&self.context.engine, request, self.context.registry.clone()) {
                Ok(run) => {
                    self.state = State::Pass2 {
                        queue,
                        current: Some((split, run)),
                    }
                }
                Err(e) => self.fail(e),
            }
            return;
        };

        match run.next() {
            Some(Ok(line)) => {
                self.emit(ProgressEvent::Line(line));
                self.state = State::Pass2 {
                    queue,
                    current: Some((split, run)),
                };
            }
            Some(Err(e)) => self.fail(e),
            None if run.was_cancelled() => self.cancelled(),
            None => {
                self.completed_splits.push(split);
                self.state = State::Pass2 {
                    queue,
                    current: None,
                }
            }
        }
    }

    /// Copy pass outputs into the canonical directory (6/8 stems) and check
    /// what is missing
    ///
    /// Only splits that ran in this run contribute; stems left in the
    /// canonical directory by an earlier run are removed first.
    fn assemble(&mut self) {
        let plan = self.plan();
        let canonical = self.canonical_dir();

        if plan.needs_assembly() {
            if let Err(e) = std::fs::create_dir_all(&canonical) {
                return self.fail(SeparationError::Io(e));
            }
            for stem in plan.stems() {
                for file in [stem.file.to_string(), enhanced_file_name(stem.file)] {
                    if let Err(e) = remove_file_if_exists(&canonical.join(file)) {
                        return self.fail(SeparationError::Io(e));
                    }
                }
            }

            let pass1 = self.pass1_dir();
            let mut copies: Vec<(PathBuf, &'static str)> = plan
                .base_stems
                .iter()
                .map(|stem| (pass1.join(stem.file), stem.file))
                .collect();
            for split in &self.completed_splits {
                let scratch = split.scratch_dir(&self.request.output_root, &self.job_key, &self.model);
                for (from, to) in split.outputs {
                    copies.push((scratch.join(from), to));
                }
            }

            for (from, to) in copies {
                if !from.is_file() {
                    continue;
                }
                let dest = canonical.join(to);
                if let Err(e) = std::fs::copy(&from, &dest) {
                    return self.fail(SeparationError::Assembly {
                        from,
                        to: dest,
                        source: e,
                    });
                }
                log::debug!("[SEPARATION] {}: assembled {}", self.job_key, to);
            }

            for split in plan.splits {
                let scratch_root = split.job_scratch_root(&self.request.output_root, &self.job_key);
                if let Err(e) = clear_dir(&scratch_root) {
                    log::warn!(
                        "[SEPARATION] {}: failed to remove scratch {:?}: {}",
                        self.job_key,
                        scratch_root,
                        e
                    );
                }
            }
        }

        let missing: Vec<String> = plan
            .expected_files()
            .into_iter()
            .filter(|file| !canonical.join(file).is_file())
            .map(str::to_string)
            .collect();
        let produced = plan.expected_files().len() - missing.len();
        if !missing.is_empty() {
            self.notice(SeparationError::AssemblyIncomplete { missing }.to_string());
        }
        self.milestone(format!("{} stems ready in {}", produced, canonical.display()));

        self.state = if self.request.enhance {
            self.milestone("Enhancing stems");
            State::Enhance(plan.stems().collect())
        } else {
            State::Finish
        };
    }

    fn enhance(&mut self, mut queue: VecDeque<&'static StemSpec>) {
        let Some(stem) = queue.pop_front() else {
            self.state = State::Finish;
            return;
        };
        self.state = State::Enhance(queue);

        let dir = self.canonical_dir();
        let source = dir.join(stem.file);
        if !source.is_file() {
            return;
        }

        let target = dir.join(enhanced_file_name(stem.file));
        match enhance_file(
            &source,
            &target,
            stem.enhance_role,
            self.request.silence_threshold_db,
        ) {
            Ok(EnhanceOutcome::Written(_)) => self.milestone(format!("Enhanced {}", stem.file)),
            Ok(EnhanceOutcome::NoOp) => {
                self.notice(format!("{} is silent after trimming, kept as is", stem.file))
            }
            Err(e) => self.notice(format!("Failed to enhance {}: {}", stem.file, e)),
        }
    }

    fn finish(&mut self) {
        let plan = self.plan();
        let output_dir = self.canonical_dir();
        let stems = collect_artifacts(plan, &self.request.output_root, &output_dir);
        let name = original_name(
            &self
                .request
                .input
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let record = SeparationRecord {
            job_key: self.job_key.clone(),
            original_name: name.clone(),
            input_path: self.request.input.clone(),
            model: self.model.clone(),
            stem_count: plan.stem_count,
            output_root: self.request.output_root.clone(),
            output_dir,
            stems,
        };

        log::info!(
            "[SEPARATION] {} complete: {} files in {:?}",
            self.job_key,
            record.stems.len(),
            record.output_dir
        );

        self.state = State::Done;
        self.claim = None;
        self.emit(ProgressEvent::Complete {
            job_key: self.job_key.clone(),
            original_name: name,
            record,
        });
    }
}

/// Remove `dir` and everything under it; a missing directory is fine
fn clear_dir(dir: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

impl Iterator for SeparationRun {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                if event.is_terminal() {
                    self.pending.clear();
                    self.state = State::Done;
                }
                return Some(event);
            }
            if matches!(self.state, State::Done) {
                return None;
            }
            self.step();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{dir_has_exactly, fake_engine, hanging_engine};
    use stemforge_core::audio_file::write_wav;
    use stemforge_core::testing::click_track;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        input: PathBuf,
        registry: Arc<JobRegistry>,
        claims: Arc<ClaimSet>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("track.wav");
        write_wav(&input, &click_track(120.0, 2.0, 44100)).unwrap();
        Fixture {
            root: dir.path().join("out"),
            input,
            _dir: dir,
            registry: Arc::new(JobRegistry::new()),
            claims: Arc::new(ClaimSet::new()),
        }
    }

    fn run(fx: &Fixture, engine: EngineConfig, stem_count: u32, enhance: bool) -> SeparationRun {
        SeparationRun::new(
            SeparationRequest {
                input: fx.input.clone(),
                output_root: fx.root.clone(),
                model: "engineA".to_string(),
                device: "cpu".to_string(),
                stem_count,
                enhance,
                silence_threshold_db: 30.0,
            },
            RunContext {
                engine,
                high_quality_model: "htdemucs_ft".to_string(),
                registry: fx.registry.clone(),
                claims: fx.claims.clone(),
            },
        )
    }

    fn terminal(events: &[ProgressEvent]) -> &ProgressEvent {
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        let last = events.last().unwrap();
        assert!(last.is_terminal());
        last
    }

    #[test]
    fn test_four_stem_run_produces_plan_files() {
        let fx = fixture();
        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 4, false).collect();

        match terminal(&events) {
            ProgressEvent::Complete { job_key, record, .. } => {
                assert_eq!(job_key, "track");
                assert_eq!(record.output_dir, fx.root.join("engineA").join("track"));
                assert_eq!(record.stems.len(), 4);
            }
            other => panic!("expected Complete, got {:?}", other),
        }
        assert!(dir_has_exactly(
            &fx.root.join("engineA").join("track"),
            &["vocals.wav", "drums.wav", "bass.wav", "other.wav"]
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Line(l) if l.contains("separated track"))));
        assert!(fx.registry.active_keys().is_empty());
    }

    #[test]
    fn test_six_stem_run_assembles_components() {
        let fx = fixture();
        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 6, false).collect();

        assert!(matches!(terminal(&events), ProgressEvent::Complete { .. }));
        assert!(dir_has_exactly(
            &fx.root.join("6_components").join("track"),
            &["vocals.wav", "drums.wav", "bass.wav", "other.wav", "piano.wav", "guitar.wav"]
        ));
        assert!(!fx.root.join("advanced").join("track").exists());
    }

    #[test]
    fn test_skipped_split_never_assembles_other_jobs_scratch() {
        let fx = fixture();
        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 6, false).collect();
        assert!(matches!(terminal(&events), ProgressEvent::Complete { .. }));

        // Leftovers from a job that died before assembly
        let stale = fx.root.join("advanced").join("beta").join("engineA").join("other");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::copy(&fx.input, stale.join("other.wav")).unwrap();
        std::fs::copy(&fx.input, stale.join("no_other.wav")).unwrap();

        let mut beta = run(&fx, fake_engine_without("other"), 6, false);
        beta.request.input = fx.input.with_file_name("beta.wav");
        beta.job_key = beta.request.job_key();
        std::fs::copy(&fx.input, &beta.request.input).unwrap();
        let events: Vec<ProgressEvent> = beta.collect();

        assert!(matches!(terminal(&events), ProgressEvent::Complete { .. }));
        assert!(dir_has_exactly(
            &fx.root.join("6_components").join("beta"),
            &["vocals.wav", "drums.wav", "bass.wav"]
        ));
        assert!(dir_has_exactly(
            &fx.root.join("6_components").join("track"),
            &["vocals.wav", "drums.wav", "bass.wav", "other.wav", "piano.wav", "guitar.wav"]
        ));
        assert!(!fx.root.join("advanced").join("beta").exists());
    }

    #[test]
    fn test_rerun_drops_stems_from_previous_run() {
        let fx = fixture();
        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 6, true).collect();
        assert!(matches!(terminal(&events), ProgressEvent::Complete { .. }));
        assert!(fx.root.join("6_components/track/enhanced_piano.wav").is_file());

        let events: Vec<ProgressEvent> = run(&fx, fake_engine_without("other"), 6, false).collect();
        match terminal(&events) {
            ProgressEvent::Complete { record, .. } => assert_eq!(record.stems.len(), 3),
            other => panic!("expected Complete, got {:?}", other),
        }
        assert!(dir_has_exactly(
            &fx.root.join("6_components").join("track"),
            &["vocals.wav", "drums.wav", "bass.wav"]
        ));
    }

    #[test]
    fn test_eight_stem_run_pins_model_and_assembles_ten_files() {
        let fx = fixture();
        let mut separation = run(&fx, fake_engine(), 8, false);
        let events: Vec<ProgressEvent> = separation.by_ref().collect();

        assert_eq!(separation.model(), "htdemucs_ft");
        match terminal(&events) {
            ProgressEvent::Complete { record, .. } => {
                assert_eq!(record.model, "htdemucs_ft");
                assert_eq!(record.stems.len(), 10);
            }
            other => panic!("expected Complete, got {:?}", other),
        }
        assert!(fx.root.join("htdemucs_ft").join("track").is_dir());
        assert!(dir_has_exactly(
            &fx.root.join("8_components").join("track"),
            &[
                "vocals.wav",
                "drums.wav",
                "bass.wav",
                "other.wav",
                "lead_vocals.wav",
                "harmony.wav",
                "kick_snare.wav",
                "cymbals.wav",
                "piano.wav",
                "guitar.wav",
            ]
        ));
    }

    #[test]
    fn test_missing_source_skips_split_but_completes() {
        let fx = fixture();
        // Pass 1 never writes other.wav
        let events: Vec<ProgressEvent> = run(&fx, fake_engine_without("other"), 6, false).collect();

        assert!(matches!(terminal(&events), ProgressEvent::Complete { .. }));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Notice(n) if n.contains("Skipping other split"))));
        assert!(dir_has_exactly(
            &fx.root.join("6_components").join("track"),
            &["vocals.wav", "drums.wav", "bass.wav"]
        ));
    }

    fn fake_engine_without(stem: &str) -> EngineConfig {
        let mut engine = fake_engine();
        engine.args.push(format!("--skip={}", stem));
        engine
    }

    #[test]
    fn test_enhance_writes_enhanced_variants() {
        let fx = fixture();
        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 4, true).collect();

        match terminal(&events) {
            ProgressEvent::Complete { record, .. } => {
                assert_eq!(record.stems.len(), 8);
                assert!(record.stems[1].enhanced);
                assert_eq!(record.stems[1].display_name, "Vocals (Enhanced)");
            }
            other => panic!("expected Complete, got {:?}", other),
        }
        let dir = fx.root.join("engineA").join("track");
        assert!(dir.join("enhanced_bass.wav").is_file());
        assert!(dir.join("bass.wav").is_file());
    }

    #[test]
    fn test_engine_failure_is_single_error_event() {
        let fx = fixture();
        let engine = EngineConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 'CUDA out of memory' >&2; exit 1".to_string(), "engine".to_string()],
        };
        let events: Vec<ProgressEvent> = run(&fx, engine, 6, false).collect();

        match terminal(&events) {
            ProgressEvent::Error { message } => assert!(message.contains("CUDA out of memory")),
            other => panic!("expected Error, got {:?}", other),
        }
        assert!(!fx.claims.is_claimed(&fx.root, "track"));
    }

    #[test]
    fn test_cancel_during_pass1() {
        let fx = fixture();
        let mut separation = run(&fx, hanging_engine(), 4, false);

        loop {
            match separation.next() {
                Some(ProgressEvent::Line(line)) if line == "started" => break,
                Some(event) => assert!(!event.is_terminal(), "ended early: {:?}", event),
                None => panic!("run ended before engine output"),
            }
        }
        assert!(fx.registry.cancel("track"));

        let rest: Vec<ProgressEvent> = separation.collect();
        assert!(matches!(
            terminal(&rest),
            ProgressEvent::Cancelled { job_key } if job_key == "track"
        ));
        assert!(!fx.registry.contains("track"));
    }

    #[test]
    fn test_invalid_requests_fail_immediately() {
        let fx = fixture();
        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 5, false).collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProgressEvent::Error { message } if message.contains("5")));

        let mut missing = run(&fx, fake_engine(), 4, false);
        missing.request.input = fx.root.join("nope.wav");
        let events: Vec<ProgressEvent> = missing.collect();
        assert!(matches!(&events[0], ProgressEvent::Error { message } if message.contains("not found")));
    }

    #[test]
    fn test_concurrent_run_on_same_output_is_busy() {
        let fx = fixture();
        let mut first = run(&fx, hanging_engine(), 4, false);
        assert!(matches!(first.next(), Some(ProgressEvent::Milestone(_))));

        let events: Vec<ProgressEvent> = run(&fx, fake_engine(), 4, false).collect();
        assert!(matches!(
            terminal(&events),
            ProgressEvent::Error { message } if message.contains("in use")
        ));

        drop(first);
        assert!(fx.registry.active_keys().is_empty());
        assert!(!fx.claims.is_claimed(&fx.root, "track"));
    }
}
