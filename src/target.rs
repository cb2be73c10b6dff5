//! Target triples the project is built for.

use anyhow::{bail, Result};
use std::fmt;

/// Triples built when neither the command line nor `crossbuild.toml` names any.
pub const DEFAULT_TARGETS: &[&str] = &[
    "x86_64-unknown-linux-gnu",
    "x86_64-pc-windows-gnu",
    "x86_64-apple-darwin",
];

/// A validated rustc target triple, e.g. `x86_64-pc-windows-gnu`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetTriple(String);

impl TargetTriple {
    /// Parse and validate a triple.
    ///
    /// The triple ends up as a path component under the target directory and
    /// inside the artifact filename, so anything that could escape a directory
    /// is rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let triple = raw.trim();
        if triple.is_empty() {
            bail!("target triple must not be empty");
        }
        if triple.chars().any(char::is_whitespace) {
            bail!("target triple '{}' contains whitespace", triple);
        }
        if triple.contains('/') || triple.contains('\\') || triple.contains("..") {
            bail!("target triple '{}' must be a plain name, not a path", triple);
        }
        let parts: Vec<&str> = triple.split('-').collect();
        if parts.len() < 2 || parts.iter().any(|part| part.is_empty()) {
            bail!(
                "invalid target triple '{}'; expected <arch>-<vendor>-<os>[-<env>]",
                triple
            );
        }
        Ok(Self(triple.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_windows(&self) -> bool {
        self.0.split('-').any(|part| part == "windows")
    }

    /// Executable suffix the toolchain uses for binaries on this target.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn default_targets() -> Vec<TargetTriple> {
    DEFAULT_TARGETS
        .iter()
        .map(|triple| TargetTriple(triple.to_string()))
        .collect()
}

/// Parse a list of triples, dropping repeats while keeping first-seen order.
pub fn parse_targets<S: AsRef<str>>(raw: &[S]) -> Result<Vec<TargetTriple>> {
    let mut targets: Vec<TargetTriple> = Vec::with_capacity(raw.len());
    for value in raw {
        let triple = TargetTriple::parse(value.as_ref())?;
        if !targets.contains(&triple) {
            targets.push(triple);
        }
    }
    if targets.is_empty() {
        bail!("at least one target triple is required");
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets() {
        let targets = default_targets();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].as_str(), "x86_64-unknown-linux-gnu");
        assert_eq!(targets[1].as_str(), "x86_64-pc-windows-gnu");
        assert_eq!(targets[2].as_str(), "x86_64-apple-darwin");
    }

    #[test]
    fn test_exe_suffix() {
        assert_eq!(
            TargetTriple::parse("x86_64-pc-windows-gnu").unwrap().exe_suffix(),
            ".exe"
        );
        assert_eq!(
            TargetTriple::parse("aarch64-pc-windows-msvc").unwrap().exe_suffix(),
            ".exe"
        );
        assert_eq!(
            TargetTriple::parse("x86_64-apple-darwin").unwrap().exe_suffix(),
            ""
        );
        assert_eq!(TargetTriple::parse("wasm32-wasi").unwrap().exe_suffix(), "");
    }

    #[test]
    fn test_parse_rejects_bad_triples() {
        assert!(TargetTriple::parse("").is_err());
        assert!(TargetTriple::parse("   ").is_err());
        assert!(TargetTriple::parse("x86_64").is_err());
        assert!(TargetTriple::parse("x86_64--linux").is_err());
        assert!(TargetTriple::parse("../etc-passwd").is_err());
        assert!(TargetTriple::parse("x86_64 unknown-linux").is_err());
    }

    #[test]
    fn test_parse_trims() {
        let triple = TargetTriple::parse("  x86_64-unknown-linux-gnu\n").unwrap();
        assert_eq!(triple.to_string(), "x86_64-unknown-linux-gnu");
    }

    #[test]
    fn test_parse_targets_dedups_in_order() {
        let targets = parse_targets(&[
            "x86_64-apple-darwin",
            "x86_64-pc-windows-gnu",
            "x86_64-apple-darwin",
        ])
        .unwrap();
        let names: Vec<&str> = targets.iter().map(TargetTriple::as_str).collect();
        assert_eq!(names, vec!["x86_64-apple-darwin", "x86_64-pc-windows-gnu"]);
    }

    #[test]
    fn test_parse_targets_empty() {
        let empty: [&str; 0] = [];
        assert!(parse_targets(&empty).is_err());
    }
}
