//! Separation outputs: stem artifacts and the per-job record

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::plan::{ComponentPlan, StemCount};

/// Prefix of enhanced stem files
pub const ENHANCED_PREFIX: &str = "enhanced_";

/// Stable job key for an input file (its file stem)
pub fn job_key_for(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name shown to users: the unique file name minus its upload prefix
///
/// `"3f2a…_song.mp3"` → `"song.mp3"`. Names without `_` are returned as is.
pub fn original_name(unique_name: &str) -> String {
    match unique_name.split_once('_') {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => unique_name.to_string(),
    }
}

/// File name of the enhanced variant of `file`
pub fn enhanced_file_name(file: &str) -> String {
    format!("{}{}", ENHANCED_PREFIX, file)
}

/// One produced stem file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StemArtifact {
    pub display_name: String,
    /// Path relative to the output root
    pub relative_path: PathBuf,
    /// File stem of the un-enhanced stem, e.g. `lead_vocals`
    pub role: String,
    pub enhanced: bool,
}

/// Everything a finished separation produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparationRecord {
    pub job_key: String,
    pub original_name: String,
    pub input_path: PathBuf,
    /// Model the engine actually ran with
    pub model: String,
    pub stem_count: StemCount,
    pub output_root: PathBuf,
    /// Canonical directory holding the final stems
    pub output_dir: PathBuf,
    pub stems: Vec<StemArtifact>,
}

impl SeparationRecord {
    /// Rebuild a record from what is on disk
    ///
    /// For callers that only know the input, model and stem count of an
    /// earlier job. `model` must be the model the job ran with.
    pub fn from_layout(input_path: &Path, output_root: &Path, model: &str, stem_count: StemCount) -> Self {
        let job_key = job_key_for(input_path);
        let plan = stem_count.plan();
        let output_dir = plan.canonical_dir(output_root, model, &job_key);
        let stems = collect_artifacts(plan, output_root, &output_dir);
        let unique_name = input_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            original_name: original_name(&unique_name),
            job_key,
            input_path: input_path.to_path_buf(),
            model: model.to_string(),
            stem_count,
            output_root: output_root.to_path_buf(),
            output_dir,
            stems,
        }
    }

    /// The un-enhanced stem for `role` (`vocals`, `piano`, …)
    pub fn stem(&self, role: &str) -> Option<&StemArtifact> {
        self.stems.iter().find(|s| s.role == role && !s.enhanced)
    }

    /// Absolute path of the un-enhanced stem for `role`
    pub fn stem_path(&self, role: &str) -> Option<PathBuf> {
        self.stem(role).map(|s| self.output_root.join(&s.relative_path))
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.stems.iter().filter(|s| !s.enhanced).map(|s| s.role.as_str())
    }
}

/// List the plan's stems that exist in `output_dir`, each followed by its
/// enhanced variant when present
pub fn collect_artifacts(plan: &ComponentPlan, output_root: &Path, output_dir: &Path) -> Vec<StemArtifact> {
    let relative = |file: &str| {
        let full = output_dir.join(file);
        full.strip_prefix(output_root)
            .map(Path::to_path_buf)
            .unwrap_or(full)
    };

    let mut artifacts = Vec::new();
    for spec in plan.stems() {
        if !output_dir.join(spec.file).is_file() {
            continue;
        }
        artifacts.push(StemArtifact {
            display_name: spec.display.to_string(),
            relative_path: relative(spec.file),
            role: spec.role().to_string(),
            enhanced: false,
        });

        let enhanced = enhanced_file_name(spec.file);
        if output_dir.join(&enhanced).is_file() {
            artifacts.push(StemArtifact {
                display_name: format!("{} (Enhanced)", spec.display),
                relative_path: relative(&enhanced),
                role: spec.role().to_string(),
                enhanced: true,
            });
        }
    }
    artifacts
}
