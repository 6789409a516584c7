//! Fusion service - tempo-matches stems from several jobs and mixes them
//!
//! A request names a master job and, per role, the job supplying that stem.
//! Every stem not taken from the master is stretched to the master's tempo
//! in a private scratch directory, then everything is summed into one clip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use stemforge_core::analysis::{estimate_file_bpm, BpmConfig, UNDETECTABLE_BPM};
use stemforge_core::audio_file::read_audio;
use stemforge_core::export::export_mp3;
use stemforge_core::timestretch::{stretch_file, StretchOptions};

use super::config::FusionConfig;
use super::error::{FusionError, Result};
use super::mixer::{mix, MixInput};
use super::request::{FusionReport, FusionRequest, MixedTrack, RoleAssignment, RoleOutcome, RoleReport};
use crate::separation::SeparationRecord;

/// Main service for stem fusion
pub struct FusionService {
    config: FusionConfig,
    bpm: BpmConfig,
}

impl FusionService {
    pub fn new() -> Self {
        Self::with_config(FusionConfig::default(), BpmConfig::default())
    }

    pub fn with_config(mut config: FusionConfig, mut bpm: BpmConfig) -> Self {
        config.validate();
        bpm.validate();
        Self { config, bpm }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Render the fusion described by `request`
    ///
    /// `records` maps job keys to finished separations. Scratch files live
    /// under `{master output root}/{scratch_dir_name}` and are removed before
    /// this returns, on success or failure.
    pub fn render(
        &self,
        request: &FusionRequest,
        records: &HashMap<String, SeparationRecord>,
    ) -> Result<MixedTrack> {
        let master = records
            .get(&request.master_job)
            .ok_or_else(|| FusionError::UnknownJob(request.master_job.clone()))?;

        let master_bpm = estimate_file_bpm(&master.input_path, &self.bpm).map_err(|source| {
            FusionError::MasterAudio {
                path: master.input_path.clone(),
                source,
            }
        })?;
        if master_bpm == UNDETECTABLE_BPM {
            return Err(FusionError::TempoUndetectable(request.master_job.clone()));
        }
        log::info!(
            "[FUSION] Master {} at {:.2} BPM, {} roles requested",
            request.master_job,
            master_bpm,
            request.roles.len()
        );

        let scratch_parent = master.output_root.join(&self.config.scratch_dir_name);
        let scratch = create_scratch(&scratch_parent)?;

        let mut reports = Vec::with_capacity(request.roles.len());
        let mut inputs = Vec::new();

        for (role, assignment) in &request.roles {
            if assignment.source_job.is_empty() {
                continue;
            }
            let (outcome, clip) = if assignment.muted {
                (RoleOutcome::Muted, None)
            } else {
                match self.prepare_role(role, assignment, request, master_bpm, records, scratch.path()) {
                    Ok((outcome, clip)) => (outcome, Some(clip)),
                    Err(reason) => {
                        log::warn!("[FUSION] Skipping {}: {}", role, reason);
                        (RoleOutcome::Skipped(reason), None)
                    }
                }
            };

            if let Some(clip) = clip {
                inputs.push(MixInput {
                    role: role.clone(),
                    clip,
                    volume: assignment.volume,
                });
            }
            reports.push(RoleReport {
                role: role.clone(),
                source_job: assignment.source_job.clone(),
                volume: assignment.volume,
                outcome,
            });
        }

        if inputs.is_empty() {
            return Err(FusionError::NothingToFuse);
        }
        let clip = mix(&inputs)?;

        if let Err(e) = scratch.close() {
            log::warn!("[FUSION] Failed to remove scratch directory: {}", e);
        }

        Ok(MixedTrack {
            clip,
            report: FusionReport {
                master_job: request.master_job.clone(),
                master_bpm,
                roles: reports,
            },
        })
    }

    /// Render and write the result as MP3
    pub fn fuse(
        &self,
        request: &FusionRequest,
        records: &HashMap<String, SeparationRecord>,
        output: &Path,
    ) -> Result<FusionReport> {
        let track = self.render(request, records)?;
        export_mp3(output, &track.clip, self.config.bitrate_kbps)?;
        log::info!(
            "[FUSION] Wrote {:?} ({} of {} roles mixed)",
            output,
            track.report.mixed_roles().count(),
            track.report.roles.len()
        );
        Ok(track.report)
    }

    /// Bring one role's stem to the master tempo and load it
    ///
    /// The error string is the reason the role is skipped.
    fn prepare_role(
        &self,
        role: &str,
        assignment: &RoleAssignment,
        request: &FusionRequest,
        master_bpm: f64,
        records: &HashMap<String, SeparationRecord>,
        scratch: &Path,
    ) -> std::result::Result<(RoleOutcome, stemforge_core::AudioClip), String> {
        let record = records
            .get(&assignment.source_job)
            .ok_or_else(|| format!("no separation for job {}", assignment.source_job))?;
        let stem = record
            .stem_path(role)
            .ok_or_else(|| format!("job {} has no {} stem", assignment.source_job, role))?;

        let prepared = scratch_path(scratch, role, &stem);
        let outcome = if assignment.source_job == request.master_job {
            std::fs::copy(&stem, &prepared).map_err(|e| format!("copy failed: {}", e))?;
            RoleOutcome::Copied
        } else {
            let options = StretchOptions {
                bpm: self.bpm.clone(),
                no_op_tolerance: self.config.no_op_tolerance,
            };
            let stretched =
                stretch_file(&stem, &prepared, master_bpm, &options).map_err(|e| e.to_string())?;
            if stretched.copied {
                RoleOutcome::Copied
            } else {
                RoleOutcome::Stretched {
                    source_bpm: stretched.source_bpm,
                    rate: stretched.rate,
                }
            }
        };

        let clip = read_audio(&prepared).map_err(|e| e.to_string())?;
        Ok((outcome, clip))
    }
}

impl Default for FusionService {
    fn default() -> Self {
        Self::new()
    }
}

fn create_scratch(parent: &Path) -> Result<tempfile::TempDir> {
    std::fs::create_dir_all(parent)
        .and_then(|_| tempfile::Builder::new().prefix("fusion_").tempdir_in(parent))
        .map_err(|source| FusionError::Scratch {
            path: parent.to_path_buf(),
            source,
        })
}

/// `{scratch}/{role}.{ext}`, keeping the stem's extension
fn scratch_path(scratch: &Path, role: &str, stem: &Path) -> PathBuf {
    let ext = stem.extension().and_then(|e| e.to_str()).unwrap_or("wav");
    scratch.join(format!("{}.{}", role, ext))
}
