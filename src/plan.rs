//! The ordered list of builds one run performs, with every path resolved.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::profile::BuildProfile;
use crate::target::TargetTriple;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub target: TargetTriple,
    /// Where the toolchain leaves the binary.
    pub toolchain_output: PathBuf,
    /// Where the binary is moved to.
    pub destination: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub project_root: PathBuf,
    pub manifest_path: PathBuf,
    pub bin: String,
    pub bin_explicit: bool,
    pub profile: BuildProfile,
    pub target_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cargo: PathBuf,
    pub steps: Vec<BuildStep>,
}

/// `<bin>-<profile>-<triple>[.exe]`, e.g. `chaos-debug-x86_64-pc-windows-gnu.exe`.
pub fn artifact_file_name(bin: &str, profile: BuildProfile, target: &TargetTriple) -> String {
    format!(
        "{}-{}-{}{}",
        bin,
        profile.dir_name(),
        target,
        target.exe_suffix()
    )
}

/// `<target-dir>/<triple>/<profile>/<bin>[.exe]`, cargo's layout for `--target` builds.
pub fn toolchain_output_path(
    target_dir: &Path,
    bin: &str,
    profile: BuildProfile,
    target: &TargetTriple,
) -> PathBuf {
    target_dir
        .join(target.as_str())
        .join(profile.dir_name())
        .join(format!("{}{}", bin, target.exe_suffix()))
}

impl BuildPlan {
    pub fn from_config(config: &ProjectConfig) -> Self {
        let steps = config
            .targets
            .iter()
            .map(|target| BuildStep {
                target: target.clone(),
                toolchain_output: toolchain_output_path(
                    &config.target_dir,
                    &config.bin,
                    config.profile,
                    target,
                ),
                destination: config
                    .output_dir
                    .join(artifact_file_name(&config.bin, config.profile, target)),
            })
            .collect();

        Self {
            project_root: config.project_root.clone(),
            manifest_path: config.manifest_path.clone(),
            bin: config.bin.clone(),
            bin_explicit: config.bin_explicit,
            profile: config.profile,
            target_dir: config.target_dir.clone(),
            output_dir: config.output_dir.clone(),
            cargo: config.cargo.clone(),
            steps,
        }
    }

    /// Arguments passed to the toolchain program for one step.
    ///
    /// `--target-dir` is always explicit so the output path computed above
    /// matches where cargo writes, whatever the caller's environment says.
    pub fn cargo_args(&self, step: &BuildStep) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "build".into(),
            "--target".into(),
            step.target.as_str().into(),
            "--target-dir".into(),
            self.target_dir.clone().into_os_string(),
            "--manifest-path".into(),
            self.manifest_path.clone().into_os_string(),
        ];
        if let Some(flag) = self.profile.cargo_flag() {
            args.push(flag.into());
        }
        if self.bin_explicit {
            args.push("--bin".into());
            args.push(self.bin.clone().into());
        }
        args
    }

    pub fn command_line(&self, step: &BuildStep) -> String {
        std::iter::once(self.cargo.clone().into_os_string())
            .chain(self.cargo_args(step))
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![
            format!("project: {}", self.project_root.display()),
            format!("binary:  {} ({})", self.bin, self.profile),
            format!("output:  {}", self.output_dir.display()),
        ];
        for (index, step) in self.steps.iter().enumerate() {
            lines.push(format!(
                "[{}/{}] {}",
                index + 1,
                self.steps.len(),
                step.target
            ));
            lines.push(format!("    run:  {}", self.command_line(step)));
            lines.push(format!(
                "    move: {} -> {}",
                step.toolchain_output.display(),
                step.destination.display()
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::default_targets;

    fn config(profile: BuildProfile, bin_explicit: bool) -> ProjectConfig {
        ProjectConfig {
            project_root: PathBuf::from("/work/chaos"),
            manifest_path: PathBuf::from("/work/chaos/Cargo.toml"),
            bin: "chaos".to_string(),
            bin_explicit,
            targets: default_targets(),
            profile,
            target_dir: PathBuf::from("/work/chaos/target"),
            output_dir: PathBuf::from("/work/chaos/target/builds"),
            cargo: PathBuf::from("cargo"),
            keep_going: false,
        }
    }

    #[test]
    fn test_default_plan_paths() {
        let plan = BuildPlan::from_config(&config(BuildProfile::Debug, false));
        let destinations: Vec<PathBuf> = plan.steps.iter().map(|s| s.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                PathBuf::from("/work/chaos/target/builds/chaos-debug-x86_64-unknown-linux-gnu"),
                PathBuf::from("/work/chaos/target/builds/chaos-debug-x86_64-pc-windows-gnu.exe"),
                PathBuf::from("/work/chaos/target/builds/chaos-debug-x86_64-apple-darwin"),
            ]
        );
        assert_eq!(
            plan.steps[1].toolchain_output,
            PathBuf::from("/work/chaos/target/x86_64-pc-windows-gnu/debug/chaos.exe")
        );
    }

    #[test]
    fn test_release_file_name() {
        let target = TargetTriple::parse("x86_64-apple-darwin").unwrap();
        assert_eq!(
            artifact_file_name("chaos", BuildProfile::Release, &target),
            "chaos-release-x86_64-apple-darwin"
        );
        assert_eq!(
            toolchain_output_path(Path::new("t"), "chaos", BuildProfile::Release, &target),
            PathBuf::from("t/x86_64-apple-darwin/release/chaos")
        );
    }

    #[test]
    fn test_cargo_args_debug() {
        let plan = BuildPlan::from_config(&config(BuildProfile::Debug, false));
        let args: Vec<String> = plan
            .cargo_args(&plan.steps[0])
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "build",
                "--target",
                "x86_64-unknown-linux-gnu",
                "--target-dir",
                "/work/chaos/target",
                "--manifest-path",
                "/work/chaos/Cargo.toml",
            ]
        );
    }

    #[test]
    fn test_cargo_args_release_with_bin() {
        let plan = BuildPlan::from_config(&config(BuildProfile::Release, true));
        let line = plan.command_line(&plan.steps[2]);
        assert!(line.starts_with("cargo build --target x86_64-apple-darwin"));
        assert!(line.ends_with("--release --bin chaos"));
    }

    #[test]
    fn test_describe_lists_every_step() {
        let plan = BuildPlan::from_config(&config(BuildProfile::Debug, false));
        let text = plan.describe().join("\n");
        assert!(text.contains("[1/3] x86_64-unknown-linux-gnu"));
        assert!(text.contains("[3/3] x86_64-apple-darwin"));
        assert!(text.contains("chaos-debug-x86_64-pc-windows-gnu.exe"));
    }
}
