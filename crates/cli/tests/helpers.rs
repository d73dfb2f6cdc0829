use std::fs;
use std::path::Path;

use app_thinner::{canonicalize_or_current, display_name, format_bytes};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_returns_cwd_for_dot() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    let expected = tmp.path().canonicalize().expect("canon tmp");
    assert_eq!(result, expected);

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn canonicalize_or_current_keeps_missing_paths_absolute() {
    let tmp = tempdir().expect("tempdir");
    let nested = tmp.path().join("apps");
    fs::create_dir_all(&nested).expect("create apps");

    let existing = canonicalize_or_current(&nested.to_string_lossy()).expect("existing");
    assert_eq!(existing, nested.canonicalize().expect("canon apps"));

    let missing = canonicalize_or_current("definitely-missing-dir").expect("missing");
    assert!(missing.is_absolute());
    assert!(missing.ends_with("definitely-missing-dir"));
}

#[test]
fn display_name_prefers_last_component() {
    assert_eq!(display_name(Path::new("/Applications/Safari.app")), "Safari.app");
    assert_eq!(display_name(Path::new("/")), "/");
}

#[test]
fn format_bytes_uses_decimal_units() {
    assert_eq!(format_bytes(0), "0 bytes");
    assert_eq!(format_bytes(1), "1 byte");
    assert_eq!(format_bytes(999), "999 bytes");
    assert_eq!(format_bytes(1_000), "1 KB");
    assert_eq!(format_bytes(48_213), "48 KB");
    assert_eq!(format_bytes(12_400_000), "12.4 MB");
    assert_eq!(format_bytes(3_210_000_000), "3.2 GB");
    assert_eq!(format_bytes(5_000_000_000_000), "5.0 TB");
}
