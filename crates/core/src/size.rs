//! Byte accounting for reports.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

/// Total size in bytes of the regular files at or under `path`.
///
/// Symlinks are counted as zero and never followed, so a `Versions/Current`
/// link is not double counted. Missing or unreadable paths count as zero.
pub fn disk_usage(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if meta.is_file() {
        return meta.len();
    }
    if !meta.is_dir() {
        return 0;
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
