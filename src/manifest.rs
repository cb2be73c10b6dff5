//! `manifest-<profile>.json` in the output directory: what each run left there.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::profile::BuildProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub target: String,
    pub file_name: String,
    pub sha256: String,
    pub size_bytes: u64,
    pub built_at_unix: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub bin: String,
    pub profile: BuildProfile,
    pub generated_at_unix: i64,
    pub artifacts: Vec<ArtifactRecord>,
}

pub fn manifest_file_name(profile: BuildProfile) -> String {
    format!("manifest-{}.json", profile.dir_name())
}

pub fn manifest_path(output_dir: &Path, profile: BuildProfile) -> PathBuf {
    output_dir.join(manifest_file_name(profile))
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

impl BuildManifest {
    pub fn new(bin: &str, profile: BuildProfile) -> Self {
        Self {
            bin: bin.to_string(),
            profile,
            generated_at_unix: now_unix(),
            artifacts: Vec::new(),
        }
    }

    /// `Ok(None)` when no manifest has been written yet.
    pub fn load(output_dir: &Path, profile: BuildProfile) -> Result<Option<Self>> {
        let path = manifest_path(output_dir, profile);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes =
            fs::read(&path).with_context(|| format!("reading build manifest '{}'", path.display()))?;
        let parsed: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing build manifest '{}'", path.display()))?;
        Ok(Some(parsed))
    }

    /// Start from the previous manifest for the same binary so a run that
    /// builds a subset of targets keeps the other records.
    pub fn load_or_new(output_dir: &Path, bin: &str, profile: BuildProfile) -> Result<Self> {
        match Self::load(output_dir, profile)? {
            Some(mut previous) if previous.bin == bin => {
                previous.generated_at_unix = now_unix();
                Ok(previous)
            }
            _ => Ok(Self::new(bin, profile)),
        }
    }

    /// Insert or replace the record for `record.target`, keeping records
    /// sorted by triple.
    pub fn upsert(&mut self, record: ArtifactRecord) {
        self.artifacts.retain(|existing| existing.target != record.target);
        self.artifacts.push(record);
        self.artifacts.sort_by(|a, b| a.target.cmp(&b.target));
    }

    /// Write via a temporary file and rename so readers never see a torn file.
    pub fn save(&self, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;
        let path = manifest_path(output_dir, self.profile);
        let tmp = output_dir.join(format!(".{}.tmp", manifest_file_name(self.profile)));
        let json = serde_json::to_vec_pretty(self).context("serializing build manifest")?;
        fs::write(&tmp, json)
            .with_context(|| format!("writing build manifest '{}'", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| {
            format!("renaming '{}' -> '{}'", tmp.display(), path.display())
        })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(target: &str, sha: &str) -> ArtifactRecord {
        ArtifactRecord {
            target: target.to_string(),
            file_name: format!("chaos-debug-{target}"),
            sha256: sha.to_string(),
            size_bytes: 3,
            built_at_unix: 1_700_000_000,
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(BuildManifest::load(temp.path(), BuildProfile::Debug)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_upsert_replaces_and_sorts() {
        let mut manifest = BuildManifest::new("chaos", BuildProfile::Debug);
        manifest.upsert(record("x86_64-unknown-linux-gnu", "aa"));
        manifest.upsert(record("x86_64-apple-darwin", "bb"));
        manifest.upsert(record("x86_64-unknown-linux-gnu", "cc"));

        let targets: Vec<&str> = manifest.artifacts.iter().map(|a| a.target.as_str()).collect();
        assert_eq!(targets, vec!["x86_64-apple-darwin", "x86_64-unknown-linux-gnu"]);
        assert_eq!(manifest.artifacts[1].sha256, "cc");
    }

    #[test]
    fn test_save_then_load_or_new_keeps_records() {
        let temp = TempDir::new().unwrap();
        let mut manifest = BuildManifest::new("chaos", BuildProfile::Debug);
        manifest.upsert(record("x86_64-apple-darwin", "bb"));
        let path = manifest.save(temp.path()).unwrap();
        assert_eq!(path, temp.path().join("manifest-debug.json"));
        assert!(!temp.path().join(".manifest-debug.json.tmp").exists());

        let reopened = BuildManifest::load_or_new(temp.path(), "chaos", BuildProfile::Debug).unwrap();
        assert_eq!(reopened.artifacts, manifest.artifacts);

        // Other profiles and binaries start fresh.
        let release =
            BuildManifest::load_or_new(temp.path(), "chaos", BuildProfile::Release).unwrap();
        assert!(release.artifacts.is_empty());
        let server =
            BuildManifest::load_or_new(temp.path(), "chaos-server", BuildProfile::Debug).unwrap();
        assert!(server.artifacts.is_empty());
    }

    #[test]
    fn test_corrupt_manifest_is_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("manifest-release.json"), "{not json").unwrap();
        let err = BuildManifest::load(temp.path(), BuildProfile::Release).unwrap_err();
        assert!(format!("{err:#}").contains("parsing build manifest"));
    }
}
