use std::path::PathBuf;
use thiserror::Error;

/// Build failures the binary turns into a process exit code.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("toolchain failed for target '{target}' (exit code {})", display_code(.code))]
    ToolchainFailed { target: String, code: Option<i32> },

    #[error("toolchain succeeded for target '{target}' but produced no binary at {}", .path.display())]
    ArtifactMissing { target: String, path: PathBuf },

    #[error("target '{target}' failed: {error}")]
    StepFailed { target: String, error: String },

    #[error("{} target(s) failed: {}", .failed.len(), .failed.join(", "))]
    StepsFailed { failed: Vec<String>, code: Option<i32> },
}

pub(crate) fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl BuildError {
    /// Exit code for the process: the toolchain's own code when it reported
    /// one, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ToolchainFailed { code, .. } | Self::StepsFailed { code, .. } => {
                code.filter(|c| *c != 0).unwrap_or(1)
            }
            Self::ArtifactMissing { .. } | Self::StepFailed { .. } => 1,
        }
    }
}
