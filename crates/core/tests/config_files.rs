use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;
use thinner_core::config::{ConfigError, ThinConfig};
use thinner_core::StripStrategy;

#[test]
fn loads_partial_json_config() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("thin.json");
    fs::write(&path, r#"{ "dry_run": true, "strategy": "atomic_rename", "arch": "x86_64" }"#)
        .expect("write");

    let config = ThinConfig::load(&path).expect("load json");
    assert!(config.dry_run);
    assert_eq!(config.strategy, StripStrategy::AtomicRename);
    assert_eq!(config.search_directory, PathBuf::from("/Applications"));
    assert_eq!(config.host_arch().expect("host").cpu_type, thinner_core::CpuType::X86_64);
}

#[test]
fn loads_yaml_config() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("thin.yml");
    fs::write(
        &path,
        "search_directory: /opt/apps\nremove_unused_framework_versions: true\napps_only: true\n",
    )
    .expect("write");

    let config = ThinConfig::load(&path).expect("load yaml");
    assert_eq!(config.search_directory, PathBuf::from("/opt/apps"));
    assert!(config.remove_unused_framework_versions);
    assert!(config.apps_only);
    assert!(config.thin_options().remove_unused_framework_versions);
}

#[test]
fn rejects_unknown_extension() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("thin.toml");
    fs::write(&path, "dry_run = true").expect("write");
    assert!(matches!(ThinConfig::load(&path), Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn reports_parse_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("thin.json");
    fs::write(&path, "not-json").expect("write");
    let err = ThinConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
    assert!(err.to_string().contains("failed to parse JSON config"));
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("missing.yaml");
    let err = ThinConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("missing.yaml"), "{err}");
}
