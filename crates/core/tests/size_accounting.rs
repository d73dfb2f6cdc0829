use std::fs;

use tempfile::tempdir;
use thinner_core::size::disk_usage;

#[test]
fn regular_file_reports_its_length() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("file");
    fs::write(&path, vec![0u8; 1234]).expect("write");
    assert_eq!(disk_usage(&path), 1234);
}

#[test]
fn directory_sums_nested_files() {
    let dir = tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("a/b/c")).expect("mkdirs");
    fs::write(dir.path().join("top"), vec![0u8; 10]).expect("write");
    fs::write(dir.path().join("a/mid"), vec![0u8; 20]).expect("write");
    fs::write(dir.path().join("a/b/c/deep"), vec![0u8; 30]).expect("write");
    assert_eq!(disk_usage(dir.path()), 60);
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_followed() {
    let dir = tempdir().expect("tempdir");
    let versions = dir.path().join("Versions");
    fs::create_dir_all(versions.join("A")).expect("mkdir");
    fs::write(versions.join("A").join("Lib"), vec![0u8; 50]).expect("write");
    std::os::unix::fs::symlink("A", versions.join("Current")).expect("symlink");
    std::os::unix::fs::symlink(dir.path(), versions.join("Loop")).expect("loop symlink");

    assert_eq!(disk_usage(&versions), 50);
    assert_eq!(disk_usage(&versions.join("Current")), 0);
}

#[test]
fn missing_path_counts_as_zero() {
    let dir = tempdir().expect("tempdir");
    assert_eq!(disk_usage(&dir.path().join("missing")), 0);
}
