use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crossbuild::{BuildProfile, ConfigOverrides};

/// Build a cargo binary for several target triples and collect the results
/// under target/builds.
#[derive(Parser, Debug)]
#[command(
    name = "crossbuild",
    version,
    long_about = "Runs `cargo build --target <triple>` for each configured target, one after \
                  another, and moves each binary to target/builds/<name>-<profile>-<triple>[.exe].\n\n\
                  With no subcommand, builds the default targets in debug mode."
)]
pub(crate) struct CliArgs {
    #[command(subcommand)]
    pub(crate) command: Option<Commands>,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub(crate) log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Debug-level diagnostics")]
    pub(crate) verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only report errors"
    )]
    pub(crate) quiet: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    #[command(about = "Build every target and collect the binaries")]
    Build(BuildArgs),

    #[command(about = "Print what a build would do")]
    Plan(SelectionArgs),

    #[command(about = "List collected binaries")]
    List(ProjectArgs),

    #[command(about = "Remove the output directory")]
    Clean(ProjectArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ProjectArgs {
    #[arg(
        long,
        value_name = "DIR",
        default_value = ".",
        help = "Project root containing Cargo.toml"
    )]
    pub(crate) project: PathBuf,
}

impl Default for ProjectArgs {
    fn default() -> Self {
        Self {
            project: PathBuf::from("."),
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct SelectionArgs {
    #[command(flatten)]
    pub(crate) project: ProjectArgs,

    #[arg(
        long = "target",
        value_name = "TRIPLE",
        help = "Target triple (repeatable); replaces the configured list"
    )]
    pub(crate) targets: Vec<String>,

    #[arg(long, value_name = "NAME", help = "Binary to build")]
    pub(crate) bin: Option<String>,

    #[arg(long, help = "Build with the release profile")]
    pub(crate) release: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub(crate) selection: SelectionArgs,

    #[arg(long, help = "Attempt every target even after one fails")]
    pub(crate) keep_going: bool,

    #[arg(long, help = "Print the plan without running anything")]
    pub(crate) dry_run: bool,

    #[arg(long, help = "Skip toolchain and installed-target checks")]
    pub(crate) skip_preflight: bool,
}

impl SelectionArgs {
    pub(crate) fn overrides(&self, keep_going: bool) -> ConfigOverrides {
        ConfigOverrides {
            bin: self.bin.clone(),
            targets: self.targets.clone(),
            profile: self.release.then_some(BuildProfile::Release),
            keep_going,
        }
    }
}
