use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cargo build profile.
///
/// `dir_name` doubles as the toolchain's output subdirectory and as the label
/// embedded in renamed artifact filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildProfile {
    #[default]
    Debug,
    Release,
}

impl BuildProfile {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "debug" | "dev" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            other => bail!(
                "unsupported profile '{}'; expected 'debug' (alias 'dev') or 'release'",
                other
            ),
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    pub fn cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}
