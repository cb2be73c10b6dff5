//! Preflight checks for the host toolchain.
//!
//! Validates that the toolchain program and every requested target are
//! available before the first build starts, so a missing target fails up
//! front instead of after earlier targets have already been built.

use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

use crate::plan::BuildPlan;
use crate::process::Cmd;

/// Check if a command exists on the host system.
pub fn command_exists(cmd: impl AsRef<std::ffi::OsStr>) -> bool {
    which::which(cmd).is_ok()
}

/// Check that specific tools are available.
///
/// Each tuple is (command, install hint). Every missing tool is reported in
/// one error rather than stopping at the first.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<(&str, &str)> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .copied()
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, hint)| format!("  {} (install: {})", t, hint))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// The toolchain program may be a bare name resolved via PATH or a full path.
pub fn check_toolchain(program: &Path) -> Result<()> {
    if program.components().count() > 1 {
        if program.is_file() {
            return Ok(());
        }
        bail!("toolchain program '{}' does not exist", program.display());
    }
    let name = program.to_string_lossy();
    check_required_tools(&[(&*name, "https://rustup.rs")])
}

/// Parse `rustup target list --installed` output: one triple per line.
pub fn parse_installed_targets(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Targets rustup reports as installed, or `None` when rustup is not on PATH.
///
/// Runs in the project root so a `rust-toolchain.toml` there selects the same
/// toolchain cargo will build with.
pub fn installed_targets(project_root: &Path) -> Result<Option<BTreeSet<String>>> {
    if !command_exists("rustup") {
        return Ok(None);
    }
    list_installed_targets(Path::new("rustup"), project_root).map(Some)
}

fn list_installed_targets(rustup: &Path, project_root: &Path) -> Result<BTreeSet<String>> {
    let result = Cmd::new(rustup)
        .args(["target", "list", "--installed"])
        .current_dir(project_root)
        .run()?;
    Ok(parse_installed_targets(&result.stdout))
}

/// Fail with `rustup target add` hints for every target not installed.
pub fn check_targets_installed(plan: &BuildPlan, installed: &BTreeSet<String>) -> Result<()> {
    let missing: Vec<&str> = plan
        .steps
        .iter()
        .map(|step| step.target.as_str())
        .filter(|triple| !installed.contains(*triple))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|triple| format!("  {} (install: rustup target add {})", triple, triple))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing rust targets:\n{}", msg);
    }
    Ok(())
}

/// Run every check that applies to this plan.
pub fn check_plan(plan: &BuildPlan) -> Result<()> {
    check_toolchain(&plan.cargo)?;
    match installed_targets(&plan.project_root)? {
        Some(installed) => {
            debug!(?installed, "rustup targets");
            check_targets_installed(plan, &installed)
        }
        None => {
            warn!("rustup not found; skipping installed-target check");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::profile::BuildProfile;
    use crate::target::default_targets;
    use std::path::PathBuf;

    fn plan() -> BuildPlan {
        BuildPlan::from_config(&ProjectConfig {
            project_root: PathBuf::from("/work/chaos"),
            manifest_path: PathBuf::from("/work/chaos/Cargo.toml"),
            bin: "chaos".to_string(),
            bin_explicit: false,
            targets: default_targets(),
            profile: BuildProfile::Debug,
            target_dir: PathBuf::from("/work/chaos/target"),
            output_dir: PathBuf::from("/work/chaos/target/builds"),
            cargo: PathBuf::from("cargo"),
            keep_going: false,
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exists() {
        // 'sh' should exist on any Unix system
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }

    #[cfg(unix)]
    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("sh", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_failure() {
        let tools = &[
            ("nonexistent_command_xyz", "fake-package"),
            ("nonexistent_command_abc", "other-package"),
        ];
        let err = check_required_tools(tools).unwrap_err().to_string();
        assert!(err.contains("nonexistent_command_xyz (install: fake-package)"));
        assert!(err.contains("nonexistent_command_abc (install: other-package)"));
    }

    #[test]
    fn test_check_toolchain_explicit_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let fake = temp.path().join("cargo");
        assert!(check_toolchain(&fake).is_err());
        std::fs::write(&fake, "").unwrap();
        assert!(check_toolchain(&fake).is_ok());
    }

    #[test]
    fn test_parse_installed_targets() {
        let installed =
            parse_installed_targets("x86_64-unknown-linux-gnu\n  x86_64-pc-windows-gnu \n\n");
        assert_eq!(installed.len(), 2);
        assert!(installed.contains("x86_64-pc-windows-gnu"));
    }

    #[cfg(unix)]
    #[test]
    fn test_rustup_runs_in_project_root() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let project = temp.path().join("game");
        std::fs::create_dir_all(&project).unwrap();
        // Stand-in rustup that reports its working directory as a target.
        let rustup = temp.path().join("rustup");
        std::fs::write(&rustup, "#!/bin/sh\npwd -P\n").unwrap();
        std::fs::set_permissions(&rustup, std::fs::Permissions::from_mode(0o755)).unwrap();

        let listed = list_installed_targets(&rustup, &project).unwrap();
        let expected = std::fs::canonicalize(&project).unwrap();
        assert!(listed.contains(expected.to_str().unwrap()), "{listed:?}");
    }

    #[test]
    fn test_missing_targets_lists_hints() {
        let installed = parse_installed_targets("x86_64-unknown-linux-gnu\n");
        let err = check_targets_installed(&plan(), &installed).unwrap_err().to_string();
        assert!(err.contains("rustup target add x86_64-pc-windows-gnu"));
        assert!(err.contains("rustup target add x86_64-apple-darwin"));
        assert!(!err.contains("add x86_64-unknown-linux-gnu"));

        let all = parse_installed_targets(
            "x86_64-unknown-linux-gnu\nx86_64-pc-windows-gnu\nx86_64-apple-darwin\n",
        );
        assert!(check_targets_installed(&plan(), &all).is_ok());
    }
}
