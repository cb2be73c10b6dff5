use anyhow::Result;

use crossbuild::builds::{clean_builds, list_builds};
use crossbuild::config::{load_project_config, ConfigOverrides};
use crossbuild::preflight::check_plan;
use crossbuild::{run_plan, BuildPlan, Cargo, FailurePolicy, RunOptions};

use crate::workflows::cli::{BuildArgs, ProjectArgs, SelectionArgs};

pub(crate) fn build(args: &BuildArgs) -> Result<()> {
    let config = load_project_config(
        &args.selection.project.project,
        &args.selection.overrides(args.keep_going),
    )?;
    let plan = BuildPlan::from_config(&config);

    if !args.dry_run && !args.skip_preflight {
        check_plan(&plan)?;
    }

    let options = RunOptions {
        policy: if config.keep_going {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::FailFast
        },
        dry_run: args.dry_run,
    };
    run_plan(&plan, &Cargo, options)?.into_result()?;
    Ok(())
}

pub(crate) fn plan(args: &SelectionArgs) -> Result<()> {
    let config = load_project_config(&args.project.project, &args.overrides(false))?;
    for line in BuildPlan::from_config(&config).describe() {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn list(args: &ProjectArgs) -> Result<()> {
    let config = load_project_config(&args.project, &ConfigOverrides::default())?;
    let listing = list_builds(&config.output_dir)?;

    if listing.tracked.is_empty() && listing.missing.is_empty() && listing.untracked.is_empty() {
        println!("[crossbuild] no builds in {}", config.output_dir.display());
        return Ok(());
    }

    for (profile, record) in &listing.tracked {
        println!(
            "{:<8} {:<28} {:>10}  {}  {}",
            profile.dir_name(),
            record.target,
            record.size_bytes,
            short_digest(&record.sha256),
            record.file_name
        );
    }
    for (profile, record) in &listing.missing {
        println!(
            "{:<8} {:<28} {:>10}  {}  (missing)",
            profile.dir_name(),
            record.target,
            "-",
            record.file_name
        );
    }
    for path in &listing.untracked {
        println!("untracked: {}", path.display());
    }
    Ok(())
}

/// First 12 characters of a digest; manifests are hand-editable.
fn short_digest(digest: &str) -> &str {
    digest
        .char_indices()
        .nth(12)
        .map_or(digest, |(end, _)| &digest[..end])
}

pub(crate) fn clean(args: &ProjectArgs) -> Result<()> {
    let config = load_project_config(&args.project, &ConfigOverrides::default())?;
    if clean_builds(&config.output_dir)? {
        println!("[crossbuild] removed {}", config.output_dir.display());
    } else {
        println!(
            "[crossbuild] nothing to remove at {}",
            config.output_dir.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_digest() {
        assert_eq!(short_digest(&"ab".repeat(32)), "abababababab");
        assert_eq!(short_digest("abc"), "abc");
        assert_eq!(short_digest("0123456789aé€xyz"), "0123456789aé");
    }
}
