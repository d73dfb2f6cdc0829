//! Working out which entries of a framework's `Versions` directory are live.
//!
//! A framework bundle keeps each version under `Versions/<name>` and marks the
//! active one with a symlink, usually `Versions/Current -> A`. Anything that
//! no symlink points at can be removed. When there is no symlink at all we
//! cannot tell which version is live, so nothing is removable.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
    /// A symlink and the raw target it stores (not yet resolved).
    Symlink { target: PathBuf },
}

/// One direct child of a `Versions` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl VersionEntry {
    pub fn new(versions_dir: &Path, name: impl Into<String>, kind: EntryKind) -> Self {
        let name = name.into();
        let path = versions_dir.join(&name);
        Self { name, path, kind }
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, EntryKind::Symlink { .. })
    }
}

/// Preserve and removable sets for one `Versions` directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionPlan {
    /// Every symlink plus every path a symlink resolves to (normalized).
    pub preserve: BTreeSet<PathBuf>,
    /// Entries safe to delete, in the order they were given.
    pub removable: Vec<VersionEntry>,
}

impl VersionPlan {
    /// False when the directory had no symlink to say which version is live.
    pub fn has_active_marker(&self) -> bool {
        !self.preserve.is_empty()
    }

    pub fn removable_names(&self) -> Vec<&str> {
        self.removable.iter().map(|entry| entry.name.as_str()).collect()
    }
}

/// Split `entries` into the preserve set and the removable set.
///
/// Symlinks are followed exactly one level; a relative target is taken
/// relative to `versions_dir`. Dangling targets are preserved verbatim, which
/// is harmless since they cannot name a real entry.
pub fn resolve_versions(versions_dir: &Path, entries: &[VersionEntry]) -> VersionPlan {
    let mut preserve = BTreeSet::new();
    for entry in entries {
        if let EntryKind::Symlink { target } = &entry.kind {
            preserve.insert(normalize(&entry.path));
            preserve.insert(resolve_target(versions_dir, target));
        }
    }

    if preserve.is_empty() {
        return VersionPlan::default();
    }

    let removable = entries
        .iter()
        .filter(|entry| !preserve.contains(&normalize(&entry.path)))
        .cloned()
        .collect();
    VersionPlan { preserve, removable }
}

/// List the direct children of `versions_dir`, sorted by name.
pub fn read_versions_dir(versions_dir: &Path) -> io::Result<Vec<VersionEntry>> {
    let mut entries = Vec::new();
    for dir_entry in fs::read_dir(versions_dir)? {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name().to_string_lossy().to_string();
        let file_type = dir_entry.file_type()?;
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink { target: fs::read_link(dir_entry.path())? }
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        entries.push(VersionEntry::new(versions_dir, name, kind));
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn resolve_target(versions_dir: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        normalize(target)
    } else {
        normalize(&versions_dir.join(target))
    }
}

/// Lexically remove `.` and fold `..` components without touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}
