//! Component plans
//!
//! One fixed table per supported stem count describing which engine passes
//! run, where their output lands, and how it is assembled into the final
//! directory.
//!
//! | Stems | Pass 2 splits              | Final directory               |
//! |-------|----------------------------|-------------------------------|
//! | 4     | none                       | `{root}/{model}/{base}`       |
//! | 6     | other                      | `{root}/6_components/{base}`  |
//! | 8     | vocals, drums, other       | `{root}/8_components/{base}`  |
//!
//! Splits write into `{root}/{scratch_root}/{base}/…`, which is cleared
//! before the split runs and removed once the job is assembled.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stemforge_core::enhance::EnhanceRole;

use super::error::SeparationError;

/// Number of stems a job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum StemCount {
    Four,
    Six,
    Eight,
}

impl StemCount {
    pub fn as_u32(self) -> u32 {
        match self {
            StemCount::Four => 4,
            StemCount::Six => 6,
            StemCount::Eight => 8,
        }
    }

    pub fn plan(self) -> &'static ComponentPlan {
        match self {
            StemCount::Four => &FOUR_STEM_PLAN,
            StemCount::Six => &SIX_STEM_PLAN,
            StemCount::Eight => &EIGHT_STEM_PLAN,
        }
    }
}

impl TryFrom<u32> for StemCount {
    type Error = SeparationError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        match count {
            4 => Ok(StemCount::Four),
            6 => Ok(StemCount::Six),
            8 => Ok(StemCount::Eight),
            other => Err(SeparationError::UnsupportedStemCount(other)),
        }
    }
}

impl From<StemCount> for u32 {
    fn from(count: StemCount) -> u32 {
        count.as_u32()
    }
}

impl fmt::Display for StemCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// A stem file in the final directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemSpec {
    /// File name, e.g. `lead_vocals.wav`
    pub file: &'static str,
    /// Name shown to users
    pub display: &'static str,
    /// Enhancement chain applied to this stem
    pub enhance_role: EnhanceRole,
}

impl StemSpec {
    /// File name without extension, e.g. `lead_vocals`
    pub fn role(&self) -> &'static str {
        self.file.strip_suffix(".wav").unwrap_or(self.file)
    }
}

/// A second-pass two-way split of one base stem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSpec {
    /// Base stem re-separated with `--two-stems <target>`
    pub target: &'static str,
    /// Parent of the per-job scratch roots, relative to the output root
    pub scratch_root: &'static str,
    /// (engine output file, final file) pairs
    pub outputs: [(&'static str, &'static str); 2],
}

impl SplitSpec {
    /// Base stem file the split reads
    pub fn source_file(&self) -> String {
        format!("{}.wav", self.target)
    }

    /// Engine output root of this split for one job
    ///
    /// `{root}/{scratch_root}/{job_key}`; no two jobs share it.
    pub fn job_scratch_root(&self, output_root: &Path, job_key: &str) -> PathBuf {
        output_root.join(self.scratch_root).join(job_key)
    }

    /// Directory the engine writes this split's two files into
    pub fn scratch_dir(&self, output_root: &Path, job_key: &str, model: &str) -> PathBuf {
        self.job_scratch_root(output_root, job_key)
            .join(model)
            .join(self.target)
    }
}

/// Fixed template for one stem count
#[derive(Debug, PartialEq, Eq)]
pub struct ComponentPlan {
    pub stem_count: StemCount,
    /// Final directory name under the output root; `None` means the pass-1
    /// directory is final
    pub assembled_dir: Option<&'static str>,
    /// Ignore the requested model and use the high-quality one
    pub pins_high_quality_model: bool,
    /// Stems produced by pass 1
    pub base_stems: &'static [StemSpec],
    /// Stems produced by pass-2 splits
    pub derived_stems: &'static [StemSpec],
    pub splits: &'static [SplitSpec],
}

const fn stem(file: &'static str, display: &'static str, enhance_role: EnhanceRole) -> StemSpec {
    StemSpec {
        file,
        display,
        enhance_role,
    }
}

const BASE_STEMS: [StemSpec; 4] = [
    stem("vocals.wav", "Vocals", EnhanceRole::Vocals),
    stem("drums.wav", "Drums", EnhanceRole::Drums),
    stem("bass.wav", "Bass", EnhanceRole::Bass),
    stem("other.wav", "Other", EnhanceRole::Other),
];

const PIANO: StemSpec = stem("piano.wav", "Piano", EnhanceRole::Other);
const GUITAR: StemSpec = stem("guitar.wav", "Guitar", EnhanceRole::Other);

pub static FOUR_STEM_PLAN: ComponentPlan = ComponentPlan {
    stem_count: StemCount::Four,
    assembled_dir: None,
    pins_high_quality_model: false,
    base_stems: &BASE_STEMS,
    derived_stems: &[],
    splits: &[],
};

pub static SIX_STEM_PLAN: ComponentPlan = ComponentPlan {
    stem_count: StemCount::Six,
    assembled_dir: Some("6_components"),
    pins_high_quality_model: false,
    base_stems: &BASE_STEMS,
    derived_stems: &[PIANO, GUITAR],
    splits: &[SplitSpec {
        target: "other",
        scratch_root: "advanced",
        outputs: [("other.wav", "piano.wav"), ("no_other.wav", "guitar.wav")],
    }],
};

pub static EIGHT_STEM_PLAN: ComponentPlan = ComponentPlan {
    stem_count: StemCount::Eight,
    assembled_dir: Some("8_components"),
    pins_high_quality_model: true,
    base_stems: &BASE_STEMS,
    derived_stems: &[
        stem("lead_vocals.wav", "Lead Vocals", EnhanceRole::Vocals),
        stem("harmony.wav", "Harmony", EnhanceRole::Vocals),
        stem("kick_snare.wav", "Kick & Snare", EnhanceRole::Drums),
        stem("cymbals.wav", "Cymbals", EnhanceRole::Drums),
        PIANO,
        GUITAR,
    ],
    splits: &[
        SplitSpec {
            target: "vocals",
            scratch_root: "advanced_vocals",
            outputs: [("vocals.wav", "lead_vocals.wav"), ("no_vocals.wav", "harmony.wav")],
        },
        SplitSpec {
            target: "drums",
            scratch_root: "advanced_drums",
            outputs: [("drums.wav", "kick_snare.wav"), ("no_drums.wav", "cymbals.wav")],
        },
        SplitSpec {
            target: "other",
            scratch_root: "advanced_other",
            outputs: [("other.wav", "piano.wav"), ("no_other.wav", "guitar.wav")],
        },
    ],
};

impl ComponentPlan {
    /// Plan for a raw stem count
    pub fn for_count(count: u32) -> Result<&'static ComponentPlan, SeparationError> {
        Ok(StemCount::try_from(count)?.plan())
    }

    /// All final stems, base stems first
    pub fn stems(&self) -> impl Iterator<Item = &'static StemSpec> {
        self.base_stems.iter().chain(self.derived_stems.iter())
    }

    /// File names the final directory holds after a complete run
    pub fn expected_files(&self) -> Vec<&'static str> {
        self.stems().map(|s| s.file).collect()
    }

    pub fn stem_spec(&self, file: &str) -> Option<&'static StemSpec> {
        self.stems().find(|s| s.file == file)
    }

    /// Model the engine is actually run with
    pub fn effective_model<'a>(&self, requested: &'a str, high_quality: &'a str) -> &'a str {
        if self.pins_high_quality_model {
            high_quality
        } else {
            requested
        }
    }

    /// Directory pass 1 writes the base stems into
    pub fn pass1_dir(&self, output_root: &Path, model: &str, base_name: &str) -> PathBuf {
        output_root.join(model).join(base_name)
    }

    /// Directory holding the job's final stems
    pub fn canonical_dir(&self, output_root: &Path, model: &str, base_name: &str) -> PathBuf {
        match self.assembled_dir {
            Some(dir) => output_root.join(dir).join(base_name),
            None => self.pass1_dir(output_root, model, base_name),
        }
    }

    pub fn needs_assembly(&self) -> bool {
        self.assembled_dir.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_stem_count_rejected() {
        for count in [0, 2, 5, 7, 10] {
            assert!(matches!(
                StemCount::try_from(count),
                Err(SeparationError::UnsupportedStemCount(c)) if c == count
            ));
        }
    }

    #[test]
    fn test_four_stem_layout() {
        let plan = StemCount::Four.plan();
        assert_eq!(
            plan.expected_files(),
            vec!["vocals.wav", "drums.wav", "bass.wav", "other.wav"]
        );
        assert_eq!(
            plan.canonical_dir(Path::new("/out"), "engineA", "track"),
            PathBuf::from("/out/engineA/track")
        );
        assert!(plan.splits.is_empty());
    }

    #[test]
    fn test_six_stem_layout() {
        let plan = StemCount::Six.plan();
        assert_eq!(plan.expected_files().len(), 6);
        assert_eq!(
            plan.canonical_dir(Path::new("/out"), "htdemucs", "track"),
            PathBuf::from("/out/6_components/track")
        );
        let split = &plan.splits[0];
        assert_eq!(
            split.scratch_dir(Path::new("/out"), "track", "htdemucs"),
            PathBuf::from("/out/advanced/track/htdemucs/other")
        );
        assert_ne!(
            split.job_scratch_root(Path::new("/out"), "track"),
            split.job_scratch_root(Path::new("/out"), "other_track")
        );
    }

    #[test]
    fn test_eight_stem_plan_pins_model_and_declares_ten_files() {
        let plan = StemCount::Eight.plan();
        assert_eq!(plan.effective_model("mdx", "htdemucs_ft"), "htdemucs_ft");
        assert_eq!(StemCount::Four.plan().effective_model("mdx", "htdemucs_ft"), "mdx");
        assert_eq!(plan.expected_files().len(), 10);
        assert_eq!(plan.splits.len(), 3);
    }

    #[test]
    fn test_every_split_output_is_a_derived_stem() {
        for count in [StemCount::Four, StemCount::Six, StemCount::Eight] {
            let plan = count.plan();
            for split in plan.splits {
                assert!(plan.base_stems.iter().any(|s| s.file == split.source_file()));
                for (_, dest) in split.outputs {
                    assert!(plan.derived_stems.iter().any(|s| s.file == dest));
                }
            }
        }
    }

    #[test]
    fn test_enhance_roles() {
        let plan = StemCount::Eight.plan();
        assert_eq!(plan.stem_spec("harmony.wav").unwrap().enhance_role, EnhanceRole::Vocals);
        assert_eq!(plan.stem_spec("cymbals.wav").unwrap().enhance_role, EnhanceRole::Drums);
        assert_eq!(plan.stem_spec("guitar.wav").unwrap().enhance_role, EnhanceRole::Other);
        assert_eq!(plan.stem_spec("kick_snare.wav").unwrap().role(), "kick_snare");
    }

    #[test]
    fn test_stem_count_serde() {
        let count: StemCount = serde_yaml::from_str("6").unwrap();
        assert_eq!(count, StemCount::Six);
        assert!(serde_yaml::from_str::<StemCount>("5").is_err());
    }
}
