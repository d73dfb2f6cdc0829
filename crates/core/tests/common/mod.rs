//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use thinner_core::fat::{FAT_CIGAM_64, FAT_MAGIC, FAT_MAGIC_64};
use thinner_core::CpuType;

/// Build a fat container holding one payload per `(cpu, bytes)` pair.
///
/// Payloads are laid out back to back after the slice table, in the order
/// given, so the table order matches file order.
pub fn fat_bytes(magic: u32, slices: &[(CpuType, &[u8])]) -> Vec<u8> {
    let is_64 = matches!(magic, FAT_MAGIC_64 | FAT_CIGAM_64);
    let record_size = if is_64 { 32 } else { 20 };
    let mut offset = 8 + record_size * slices.len() as u64;

    let mut out = Vec::new();
    out.extend_from_slice(&magic.to_be_bytes());
    out.extend_from_slice(&(slices.len() as u32).to_be_bytes());
    for (cpu, payload) in slices {
        out.extend_from_slice(&cpu.0.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        if is_64 {
            out.extend_from_slice(&offset.to_be_bytes());
            out.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        } else {
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        }
        out.extend_from_slice(&0u32.to_be_bytes());
        if is_64 {
            out.extend_from_slice(&0u32.to_be_bytes());
        }
        offset += payload.len() as u64;
    }
    for (_, payload) in slices {
        out.extend_from_slice(payload);
    }
    out
}

/// The usual two-architecture fixture: arm64 then x86_64.
pub fn universal_bytes() -> Vec<u8> {
    fat_bytes(FAT_MAGIC, &[(CpuType::ARM64, ARM64_PAYLOAD), (CpuType::X86_64, X86_64_PAYLOAD)])
}

pub const ARM64_PAYLOAD: &[u8] = b"arm64-slice-payload-0123456789";
pub const X86_64_PAYLOAD: &[u8] = b"x86_64-slice-payload-with-some-more-bytes-in-it";

/// Write `bytes` to `path` and mark the file executable.
pub fn write_executable(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, bytes).expect("write fixture");
    set_mode(path, 0o755);
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod");
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) {}

/// Lay out `<root>/<name>.framework/Versions/{A,B}` with `Current -> B`.
#[cfg(unix)]
pub fn framework_with_versions(root: &Path, name: &str) -> std::path::PathBuf {
    let framework = root.join(format!("{name}.framework"));
    let versions = framework.join("Versions");
    for (version, size) in [("A", 100usize), ("B", 40usize)] {
        let dir = versions.join(version);
        fs::create_dir_all(dir.join("Resources")).expect("create version dir");
        fs::write(dir.join(name), vec![0u8; size]).expect("write version binary");
        fs::write(dir.join("Resources").join("Info.plist"), vec![1u8; 10]).expect("write plist");
    }
    std::os::unix::fs::symlink("B", versions.join("Current")).expect("symlink Current");
    framework
}
