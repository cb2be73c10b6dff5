//! Project configuration: `Cargo.toml`, the optional `crossbuild.toml`, the
//! environment and command-line overrides, merged in that order of increasing
//! precedence.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::profile::BuildProfile;
use crate::target::{default_targets, parse_targets, TargetTriple};

pub const CONFIG_FILENAME: &str = "crossbuild.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "target/builds";
const DEFAULT_TARGET_DIR: &str = "target";

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub project_root: PathBuf,
    pub manifest_path: PathBuf,
    pub bin: String,
    /// Set when the binary was named by the user or a single `[[bin]]`
    /// section rather than taken from `package.name`; cargo then gets `--bin`.
    pub bin_explicit: bool,
    pub targets: Vec<TargetTriple>,
    pub profile: BuildProfile,
    pub target_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cargo: PathBuf,
    pub keep_going: bool,
}

/// Values from the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bin: Option<String>,
    pub targets: Vec<String>,
    pub profile: Option<BuildProfile>,
    pub keep_going: bool,
}

/// The environment variables the loader consults, captured up front so
/// resolution stays a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct ToolEnv {
    pub cargo: Option<OsString>,
    pub cargo_target_dir: Option<OsString>,
}

impl ToolEnv {
    pub fn from_process() -> Self {
        Self {
            cargo: std::env::var_os("CARGO").filter(|v| !v.is_empty()),
            cargo_target_dir: std::env::var_os("CARGO_TARGET_DIR").filter(|v| !v.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CargoManifestToml {
    package: Option<CargoPackageToml>,
    bin: Option<Vec<CargoBinToml>>,
}

#[derive(Debug, Deserialize)]
struct CargoPackageToml {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CargoBinToml {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrossbuildFileToml {
    crossbuild: CrossbuildToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CrossbuildToml {
    bin: Option<String>,
    targets: Option<Vec<String>>,
    profile: Option<String>,
    output_dir: Option<String>,
    keep_going: Option<bool>,
}

pub fn load_project_config(project_root: &Path, overrides: &ConfigOverrides) -> Result<ProjectConfig> {
    load_project_config_with_env(project_root, overrides, &ToolEnv::from_process())
}

pub fn load_project_config_with_env(
    project_root: &Path,
    overrides: &ConfigOverrides,
    env: &ToolEnv,
) -> Result<ProjectConfig> {
    let manifest_path = project_root.join("Cargo.toml");
    let manifest_text = fs::read_to_string(&manifest_path)
        .with_context(|| format!("reading cargo manifest '{}'", manifest_path.display()))?;
    let manifest: CargoManifestToml = toml::from_str(&manifest_text)
        .with_context(|| format!("parsing cargo manifest '{}'", manifest_path.display()))?;

    let file = load_crossbuild_file(project_root)?;

    let (bin, bin_explicit) = resolve_bin(overrides, &file, &manifest, &manifest_path)?;

    let targets = match (overrides.targets.is_empty(), &file.targets) {
        (false, _) => parse_targets(overrides.targets.as_slice())?,
        (true, Some(listed)) => parse_targets(listed.as_slice()).with_context(|| {
            format!("invalid targets in '{}'", project_root.join(CONFIG_FILENAME).display())
        })?,
        (true, None) => default_targets(),
    };

    let profile = match (overrides.profile, file.profile.as_deref()) {
        (Some(profile), _) => profile,
        (None, Some(raw)) => BuildProfile::parse(raw)?,
        (None, None) => BuildProfile::default(),
    };

    let target_dir = match &env.cargo_target_dir {
        Some(dir) => resolve_project_path(project_root, Path::new(dir)),
        None => project_root.join(DEFAULT_TARGET_DIR),
    };

    let output_dir = resolve_project_path(
        project_root,
        Path::new(file.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)),
    );
    check_output_dir(project_root, &output_dir)?;

    let cargo = match &env.cargo {
        Some(program) => PathBuf::from(program),
        None => which::which("cargo").unwrap_or_else(|_| PathBuf::from("cargo")),
    };

    let config = ProjectConfig {
        project_root: project_root.to_path_buf(),
        manifest_path,
        bin,
        bin_explicit,
        targets,
        profile,
        target_dir,
        output_dir,
        cargo,
        keep_going: overrides.keep_going || file.keep_going.unwrap_or(false),
    };
    debug!(?config, "resolved project configuration");
    Ok(config)
}

fn load_crossbuild_file(project_root: &Path) -> Result<CrossbuildToml> {
    let path = project_root.join(CONFIG_FILENAME);
    if !path.is_file() {
        return Ok(CrossbuildToml::default());
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading crossbuild config '{}'", path.display()))?;
    let parsed: CrossbuildFileToml = toml::from_str(&text)
        .with_context(|| format!("parsing crossbuild config '{}'", path.display()))?;
    Ok(parsed.crossbuild)
}

fn resolve_bin(
    overrides: &ConfigOverrides,
    file: &CrossbuildToml,
    manifest: &CargoManifestToml,
    manifest_path: &Path,
) -> Result<(String, bool)> {
    if let Some(bin) = overrides.bin.as_deref().or(file.bin.as_deref()) {
        return Ok((validate_bin_name(bin)?, true));
    }

    if let Some(bins) = &manifest.bin {
        if let [single] = bins.as_slice() {
            if let Some(name) = &single.name {
                return Ok((validate_bin_name(name)?, true));
            }
        }
    }

    match &manifest.package {
        Some(package) => Ok((validate_bin_name(&package.name)?, false)),
        None => bail!(
            "'{}' has no [package] section (virtual workspace?); name the binary with --bin or `bin` in {}",
            manifest_path.display(),
            CONFIG_FILENAME
        ),
    }
}

fn validate_bin_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        bail!("binary name must not be empty");
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        bail!("binary name '{}' must be a plain name, not a path", name);
    }
    Ok(name.to_string())
}

/// `clean` removes the output directory wholesale, so it must never be the
/// project root or one of its ancestors.
fn check_output_dir(project_root: &Path, output_dir: &Path) -> Result<()> {
    let root = fs::canonicalize(project_root)
        .with_context(|| format!("resolving project root '{}'", project_root.display()))?;
    let output = normalize_path(&root.join(output_dir));
    if root.starts_with(&output) {
        bail!(
            "output_dir '{}' in {} would contain the project root '{}'",
            output_dir.display(),
            CONFIG_FILENAME,
            root.display()
        );
    }
    Ok(())
}

/// Collapse `.` and `..` without touching the filesystem; the output
/// directory may not exist yet.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

pub(crate) fn resolve_project_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
