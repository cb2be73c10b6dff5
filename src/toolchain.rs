//! The compiler toolchain invoked once per build step.

use anyhow::{Context, Result};

use crate::plan::{BuildPlan, BuildStep};
use crate::process::Cmd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainOutcome {
    Success,
    Failed { code: Option<i32> },
}

/// Builds one step of a plan, leaving the binary at `step.toolchain_output`.
pub trait Toolchain {
    fn name(&self) -> &str;
    fn build(&self, plan: &BuildPlan, step: &BuildStep) -> Result<ToolchainOutcome>;
}

/// `cargo build --target <triple>` with the toolchain's output streamed to the
/// terminal.
pub struct Cargo;

impl Toolchain for Cargo {
    fn name(&self) -> &str {
        "cargo"
    }

    fn build(&self, plan: &BuildPlan, step: &BuildStep) -> Result<ToolchainOutcome> {
        let status = Cmd::new(&plan.cargo)
            .args(plan.cargo_args(step))
            .current_dir(&plan.project_root)
            .status()
            .with_context(|| format!("running cargo for target '{}'", step.target))?;

        if status.success() {
            Ok(ToolchainOutcome::Success)
        } else {
            Ok(ToolchainOutcome::Failed {
                code: status.code(),
            })
        }
    }
}
