//! Executes a build plan: one toolchain invocation and one move per target,
//! strictly in order.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::artifact::{install_artifact, sha256_file};
use crate::error::{display_code, BuildError};
use crate::lock::BuildLock;
use crate::manifest::{now_unix, ArtifactRecord, BuildManifest};
use crate::plan::{BuildPlan, BuildStep};
use crate::target::TargetTriple;
use crate::toolchain::{Toolchain, ToolchainOutcome};

/// What happens to the remaining targets after one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    FailFast,
    KeepGoing,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub policy: FailurePolicy,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Built { sha256: String, size_bytes: u64 },
    ToolchainFailed { code: Option<i32> },
    ArtifactMissing,
    /// The toolchain could not be launched, or moving or hashing its output failed.
    StepFailed { error: String },
    /// Not attempted because an earlier step failed under `FailFast`.
    Skipped,
    /// Dry run.
    Planned,
}

#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub target: TargetTriple,
    pub toolchain_output: PathBuf,
    pub destination: PathBuf,
    pub status: StepStatus,
}

impl StepOutcome {
    fn new(step: &BuildStep, status: StepStatus) -> Self {
        Self {
            target: step.target.clone(),
            toolchain_output: step.toolchain_output.clone(),
            destination: step.destination.clone(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self.status,
            StepStatus::ToolchainFailed { .. }
                | StepStatus::ArtifactMissing
                | StepStatus::StepFailed { .. }
        )
    }

    fn to_error(&self) -> Option<BuildError> {
        match &self.status {
            StepStatus::ToolchainFailed { code } => Some(BuildError::ToolchainFailed {
                target: self.target.to_string(),
                code: *code,
            }),
            StepStatus::ArtifactMissing => Some(BuildError::ArtifactMissing {
                target: self.target.to_string(),
                path: self.toolchain_output.clone(),
            }),
            StepStatus::StepFailed { error } => Some(BuildError::StepFailed {
                target: self.target.to_string(),
                error: error.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outcomes: Vec<StepOutcome>,
    /// Set when the run wrote a manifest.
    pub manifest: Option<PathBuf>,
}

impl BuildReport {
    pub fn built(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, StepStatus::Built { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// A single failure keeps its specific error; several are summarized,
    /// carrying the first toolchain exit code seen.
    pub fn into_result(self) -> std::result::Result<Self, BuildError> {
        let mut errors: Vec<BuildError> =
            self.failures().filter_map(StepOutcome::to_error).collect();
        match errors.len() {
            0 => Ok(self),
            1 => Err(errors.remove(0)),
            _ => {
                let code = self.failures().find_map(|o| match o.status {
                    StepStatus::ToolchainFailed { code } => code,
                    _ => None,
                });
                Err(BuildError::StepsFailed {
                    failed: self.failures().map(|o| o.target.to_string()).collect(),
                    code,
                })
            }
        }
    }
}

pub fn run_plan(
    plan: &BuildPlan,
    toolchain: &dyn Toolchain,
    options: RunOptions,
) -> Result<BuildReport> {
    if options.dry_run {
        for line in plan.describe() {
            println!("{line}");
        }
        let outcomes = plan
            .steps
            .iter()
            .map(|step| StepOutcome::new(step, StepStatus::Planned))
            .collect();
        return Ok(BuildReport {
            outcomes,
            manifest: None,
        });
    }

    let _lock = BuildLock::acquire(&plan.output_dir)?;
    let mut manifest = match BuildManifest::load_or_new(&plan.output_dir, &plan.bin, plan.profile)
    {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!("discarding unreadable build manifest: {err:#}");
            BuildManifest::new(&plan.bin, plan.profile)
        }
    };
    let mut outcomes = Vec::with_capacity(plan.steps.len());
    let mut stop = false;

    for (index, step) in plan.steps.iter().enumerate() {
        if stop {
            println!("[crossbuild:{}] skipped", step.target);
            outcomes.push(StepOutcome::new(step, StepStatus::Skipped));
            continue;
        }

        println!(
            "[crossbuild:{}] building {} ({}) with {} [{}/{}]",
            step.target,
            plan.bin,
            plan.profile,
            toolchain.name(),
            index + 1,
            plan.steps.len()
        );
        let status = match run_step(plan, step, toolchain, &mut manifest) {
            Ok(status) => status,
            Err(err) => StepStatus::StepFailed {
                error: format!("{err:#}"),
            },
        };
        match &status {
            StepStatus::Built { .. } => {
                println!(
                    "[crossbuild:{}] -> {}",
                    step.target,
                    step.destination.display()
                );
            }
            StepStatus::ToolchainFailed { code } => {
                println!(
                    "[crossbuild:{}] {} failed (exit code {})",
                    step.target,
                    toolchain.name(),
                    display_code(code)
                );
            }
            StepStatus::ArtifactMissing => {
                println!(
                    "[crossbuild:{}] no binary at {}",
                    step.target,
                    step.toolchain_output.display()
                );
            }
            StepStatus::StepFailed { error } => {
                println!("[crossbuild:{}] failed: {}", step.target, error);
            }
            StepStatus::Skipped | StepStatus::Planned => {}
        }

        let outcome = StepOutcome::new(step, status);
        if outcome.is_failure() && options.policy == FailurePolicy::FailFast {
            stop = true;
        }
        outcomes.push(outcome);
    }

    let report_manifest = if outcomes
        .iter()
        .any(|o| matches!(o.status, StepStatus::Built { .. }))
    {
        Some(manifest.save(&plan.output_dir)?)
    } else {
        None
    };

    let report = BuildReport {
        outcomes,
        manifest: report_manifest,
    };
    println!(
        "[crossbuild] {}/{} targets built into {}",
        report.built(),
        plan.steps.len(),
        plan.output_dir.display()
    );
    Ok(report)
}

fn run_step(
    plan: &BuildPlan,
    step: &BuildStep,
    toolchain: &dyn Toolchain,
    manifest: &mut BuildManifest,
) -> Result<StepStatus> {
    if let ToolchainOutcome::Failed { code } = toolchain.build(plan, step)? {
        return Ok(StepStatus::ToolchainFailed { code });
    }

    if !step.toolchain_output.is_file() {
        return Ok(StepStatus::ArtifactMissing);
    }

    debug!(
        from = %step.toolchain_output.display(),
        to = %step.destination.display(),
        "relocating artifact"
    );
    install_artifact(&step.toolchain_output, &step.destination).with_context(|| {
        format!(
            "moving '{}' -> '{}'",
            step.toolchain_output.display(),
            step.destination.display()
        )
    })?;

    let (sha256, size_bytes) = sha256_file(&step.destination)?;
    info!(target_triple = %step.target, %sha256, size_bytes, "artifact installed");

    let file_name = step
        .destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    manifest.upsert(ArtifactRecord {
        target: step.target.to_string(),
        file_name,
        sha256: sha256.clone(),
        size_bytes,
        built_at_unix: now_unix(),
    });

    Ok(StepStatus::Built { sha256, size_bytes })
}
