//! Inspecting and cleaning the build output directory.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::lock::{BuildLock, LOCK_FILENAME};
use crate::manifest::{manifest_file_name, ArtifactRecord, BuildManifest};
use crate::profile::BuildProfile;

const PROFILES: [BuildProfile; 2] = [BuildProfile::Debug, BuildProfile::Release];

#[derive(Debug, Default)]
pub struct BuildsListing {
    /// Manifest records whose file is still present.
    pub tracked: Vec<(BuildProfile, ArtifactRecord)>,
    /// Manifest records whose file has gone missing.
    pub missing: Vec<(BuildProfile, ArtifactRecord)>,
    /// Files in the output directory no manifest mentions.
    pub untracked: Vec<PathBuf>,
}

fn is_bookkeeping(name: &str) -> bool {
    name == LOCK_FILENAME
        || PROFILES
            .iter()
            .any(|profile| name == manifest_file_name(*profile))
        || (name.starts_with('.') && name.ends_with(".tmp"))
}

pub fn list_builds(output_dir: &Path) -> Result<BuildsListing> {
    let mut listing = BuildsListing::default();
    if !output_dir.is_dir() {
        return Ok(listing);
    }

    let mut known = BTreeSet::new();
    for profile in PROFILES {
        let Some(manifest) = BuildManifest::load(output_dir, profile)? else {
            continue;
        };
        for record in manifest.artifacts {
            known.insert(record.file_name.clone());
            if output_dir.join(&record.file_name).is_file() {
                listing.tracked.push((profile, record));
            } else {
                listing.missing.push((profile, record));
            }
        }
    }

    for entry in WalkDir::new(output_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("reading output directory '{}'", output_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if is_bookkeeping(name) || known.contains(name) {
            continue;
        }
        listing.untracked.push(entry.path().to_path_buf());
    }

    Ok(listing)
}

/// Remove the output directory. Returns `false` when there was nothing to remove.
pub fn clean_builds(output_dir: &Path) -> Result<bool> {
    if !output_dir.exists() {
        return Ok(false);
    }
    // Held until the directory is gone so no build can start inside it.
    let _lock = BuildLock::acquire(output_dir)?;
    fs::remove_dir_all(output_dir)
        .with_context(|| format!("removing output directory '{}'", output_dir.display()))?;
    Ok(true)
}
