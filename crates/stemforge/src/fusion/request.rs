//! Fusion requests and reports

use std::collections::BTreeMap;

use stemforge_core::AudioClip;

/// Which job supplies a role, and how loud
#[derive(Debug, Clone, PartialEq)]
pub struct RoleAssignment {
    /// Job key of the separation the stem comes from; empty means unassigned
    pub source_job: String,
    /// Linear gain applied to the stem
    pub volume: f32,
    /// Muted roles are left out of the mix entirely
    pub muted: bool,
}

impl RoleAssignment {
    pub fn new(source_job: impl Into<String>) -> Self {
        Self {
            source_job: source_job.into(),
            volume: 1.0,
            muted: false,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }
}

/// Stems to combine, keyed by role (`vocals`, `drums`, `piano`, …)
#[derive(Debug, Clone, PartialEq)]
pub struct FusionRequest {
    /// Job whose tempo every other stem is stretched to
    pub master_job: String,
    pub roles: BTreeMap<String, RoleAssignment>,
}

impl FusionRequest {
    pub fn new(master_job: impl Into<String>) -> Self {
        Self {
            master_job: master_job.into(),
            roles: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>, assignment: RoleAssignment) -> Self {
        self.roles.insert(role.into(), assignment);
        self
    }
}

/// What happened to one role
#[derive(Debug, Clone, PartialEq)]
pub enum RoleOutcome {
    /// Taken from the master job (or already at tempo) and copied as is
    Copied,
    /// Time-stretched to the master tempo
    Stretched { source_bpm: f64, rate: f64 },
    Muted,
    /// Left out of the mix; the reason is for the user
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleReport {
    pub role: String,
    pub source_job: String,
    pub volume: f32,
    pub outcome: RoleOutcome,
}

impl RoleReport {
    /// True if the role made it into the mix
    pub fn mixed(&self) -> bool {
        matches!(self.outcome, RoleOutcome::Copied | RoleOutcome::Stretched { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionReport {
    pub master_job: String,
    pub master_bpm: f64,
    pub roles: Vec<RoleReport>,
}

impl FusionReport {
    pub fn mixed_roles(&self) -> impl Iterator<Item = &RoleReport> {
        self.roles.iter().filter(|r| r.mixed())
    }

    pub fn skipped_roles(&self) -> impl Iterator<Item = &RoleReport> {
        self.roles
            .iter()
            .filter(|r| matches!(r.outcome, RoleOutcome::Skipped(_)))
    }
}

/// A rendered fusion: the mix and how it was made
#[derive(Debug, Clone)]
pub struct MixedTrack {
    pub clip: AudioClip,
    pub report: FusionReport,
}
