//! Build one cargo binary for several target triples and collect the results.
//!
//! For each target the toolchain is invoked (`cargo build --target <triple>`)
//! and the produced binary is moved from cargo's output path to
//! `target/builds/<name>-<profile>-<triple>[.exe]`. Targets are processed one
//! after another.
//!
//! ```text
//! config ──> plan ──> runner ──┬──> toolchain (cargo)
//!                              ├──> artifact (move, hash)
//!                              ├──> manifest (manifest-<profile>.json)
//!                              └──> lock (.crossbuild.lock)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use crossbuild::{load_project_config, run_plan, BuildPlan, Cargo, ConfigOverrides, RunOptions};
//! use std::path::Path;
//!
//! let config = load_project_config(Path::new("."), &ConfigOverrides::default())?;
//! let plan = BuildPlan::from_config(&config);
//! let report = run_plan(&plan, &Cargo, RunOptions::default())?;
//! println!("{} binaries built", report.built());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod artifact;
pub mod builds;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod manifest;
pub mod plan;
pub mod preflight;
pub mod process;
pub mod profile;
pub mod runner;
pub mod target;
pub mod toolchain;

pub use config::{load_project_config, ConfigOverrides, ProjectConfig};
pub use error::BuildError;
pub use plan::{BuildPlan, BuildStep};
pub use profile::BuildProfile;
pub use runner::{run_plan, BuildReport, FailurePolicy, RunOptions};
pub use target::TargetTriple;
pub use toolchain::{Cargo, Toolchain, ToolchainOutcome};
