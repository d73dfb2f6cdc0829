//! Walking a search root for thinning candidates.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::arch::HostArch;
use crate::fat::{probe_file, FatFile, FatProbe};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Also collect writable `*.framework` directories.
    pub include_frameworks: bool,
}

/// A path that could not be inspected; scanning carries on past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    /// Fat binaries that contain a slice for the host.
    pub fat_files: Vec<FatFile>,
    pub frameworks: Vec<PathBuf>,
    pub errors: Vec<ScanError>,
}

/// Walk `root` (excluding `root` itself) and collect thinning candidates.
///
/// Only writable, executable regular files are probed. Fat files without a
/// host slice are skipped since there is nothing to keep.
pub fn scan_candidates(root: &Path, host: &HostArch, options: ScanOptions) -> ScanResult {
    let mut result = ScanResult::default();

    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry: {err}");
                continue;
            }
        };
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !is_writable(entry.path(), &meta) {
            continue;
        }

        let path = entry.path();
        if meta.is_dir() {
            if options.include_frameworks && has_extension(path, "framework") {
                trace!(path = %path.display(), "framework candidate");
                result.frameworks.push(path.to_path_buf());
            }
            continue;
        }
        if !meta.is_file() || !is_executable(&meta) {
            continue;
        }

        match probe_file(path) {
            Ok(FatProbe::Fat(fat)) => {
                if fat.has_arch(host.cpu_type) {
                    result.fat_files.push(fat);
                } else {
                    debug!(path = %path.display(), host = %host.cpu_type, "no slice for host");
                }
            }
            Ok(FatProbe::NotFat | FatProbe::SingleSlice(_)) => {}
            Err(err) => result
                .errors
                .push(ScanError { path: path.to_path_buf(), message: err.to_string() }),
        }
    }

    result
}

/// Top-level application bundles under `root`, sorted.
///
/// Helper apps nested inside another bundle (`A.app/.../B.app`) are
/// excluded; they are thinned as part of their parent.
pub fn find_app_bundles(root: &Path) -> Vec<PathBuf> {
    let mut apps: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir() && has_extension(entry.path(), "app"))
        .filter(|entry| {
            entry.metadata().map(|meta| is_writable(entry.path(), &meta)).unwrap_or(false)
        })
        .filter(|entry| app_components(root, entry.path()) == 1)
        .map(|entry| entry.into_path())
        .collect();
    apps.sort();
    apps
}

fn app_components(root: &Path, path: &Path) -> usize {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter(|component| has_extension(Path::new(component.as_os_str()), "app"))
        .count()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Writable by the current process, not merely carrying a write bit.
///
/// Files with no write bit at all are skipped even when running as root.
#[cfg(unix)]
fn is_writable(path: &Path, meta: &Metadata) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    if meta.permissions().readonly() {
        return false;
    }
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(_path: &Path, meta: &Metadata) -> bool {
    !meta.permissions().readonly()
}

#[cfg(unix)]
fn is_executable(meta: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &Metadata) -> bool {
    true
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn owned_file_with_write_bit_is_writable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bin");
        fs::write(&path, b"x").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        let meta = fs::metadata(&path).expect("meta");
        assert!(is_writable(&path, &meta));
    }

    #[test]
    fn mode_without_write_bits_is_not_writable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bin");
        fs::write(&path, b"x").expect("write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o555)).expect("chmod");
        let meta = fs::metadata(&path).expect("meta");
        assert!(!is_writable(&path, &meta));
    }

    #[test]
    fn write_bit_alone_is_not_enough() {
        // The metadata says writable, but the path is gone.
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bin");
        fs::write(&path, b"x").expect("write");
        let meta = fs::metadata(&path).expect("meta");
        fs::remove_file(&path).expect("remove");
        assert!(!meta.permissions().readonly());
        assert!(!is_writable(&path, &meta));
    }

    #[test]
    fn root_owned_system_binary_is_skipped_for_normal_users() {
        if unsafe { libc::geteuid() } == 0 {
            return;
        }
        let path = Path::new("/bin/sh");
        let Ok(meta) = fs::metadata(path) else {
            return;
        };
        // Typically root:root 0755, so the owner write bit is set.
        if meta.permissions().readonly() {
            return;
        }
        assert!(!is_writable(path, &meta));
    }
}
