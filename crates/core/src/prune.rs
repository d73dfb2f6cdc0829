//! Removing framework versions that nothing links to.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::size::disk_usage;
use crate::versions::{read_versions_dir, resolve_versions, VersionPlan};

#[derive(Debug, Error)]
pub enum PruneError {
    #[error("failed to read versions directory {}: {source}", path.display())]
    ReadVersions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Deletes a path from disk. Tests swap in failing implementations.
pub trait Remover {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Real filesystem removal: directories recursively, anything else unlinked.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsRemover;

impl Remover for FsRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        let meta = fs::symlink_metadata(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedVersion {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneFailure {
    pub name: String,
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of pruning one `Versions` directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    pub freed_bytes: u64,
    pub removed: Vec<RemovedVersion>,
    pub failures: Vec<PruneFailure>,
    pub dry_run: bool,
}

impl PruneReport {
    pub fn removed_names(&self) -> Vec<&str> {
        self.removed.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Delete every removable entry in `plan`.
///
/// A failure on one entry is recorded and the rest are still processed. Only
/// successful removals count toward `freed_bytes`.
pub fn prune_versions(plan: &VersionPlan, remover: &dyn Remover, dry_run: bool) -> PruneReport {
    let mut report = PruneReport { dry_run, ..PruneReport::default() };

    for entry in &plan.removable {
        let size = disk_usage(&entry.path);
        if !dry_run {
            if let Err(source) = remover.remove(&entry.path) {
                let err = PruneError::Remove { path: entry.path.clone(), source };
                warn!("{err}");
                report.failures.push(PruneFailure {
                    name: entry.name.clone(),
                    path: entry.path.clone(),
                    error: err.to_string(),
                });
                continue;
            }
        }
        info!(
            version = %entry.name,
            path = %entry.path.display(),
            size,
            dry_run,
            "removed unused framework version"
        );
        report.freed_bytes += size;
        report.removed.push(RemovedVersion {
            name: entry.name.clone(),
            path: entry.path.clone(),
            size,
        });
    }

    report
}

/// Prune `<framework_dir>/Versions`.
///
/// Returns `Ok(None)` when the framework has no `Versions` directory (flat
/// framework layout), or when no symlink marks an active version.
pub fn thin_framework(
    framework_dir: &Path,
    remover: &dyn Remover,
    dry_run: bool,
) -> Result<Option<PruneReport>, PruneError> {
    let versions_dir = framework_dir.join("Versions");
    match fs::symlink_metadata(&versions_dir) {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            debug!(framework = %framework_dir.display(), "no Versions directory");
            return Ok(None);
        }
    }

    let entries = read_versions_dir(&versions_dir)
        .map_err(|source| PruneError::ReadVersions { path: versions_dir.clone(), source })?;
    let plan = resolve_versions(&versions_dir, &entries);
    if !plan.has_active_marker() {
        debug!(framework = %framework_dir.display(), "no version symlink, leaving versions alone");
        return Ok(None);
    }
    if plan.removable.is_empty() {
        return Ok(None);
    }

    Ok(Some(prune_versions(&plan, remover, dry_run)))
}
