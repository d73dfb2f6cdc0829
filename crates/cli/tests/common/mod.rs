#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use thinner_core::fat::FAT_MAGIC;
use thinner_core::CpuType;

pub const ARM64_PAYLOAD: &[u8] = b"arm64-payload-bytes";
pub const X86_64_PAYLOAD: &[u8] = b"x86_64-payload-bytes-and-then-some";

/// Two-slice fat file (arm64 then x86_64) with a 32-bit slice table.
pub fn universal_bytes() -> Vec<u8> {
    let slices: [(CpuType, &[u8]); 2] =
        [(CpuType::ARM64, ARM64_PAYLOAD), (CpuType::X86_64, X86_64_PAYLOAD)];
    let mut offset = 8 + 20 * slices.len() as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&FAT_MAGIC.to_be_bytes());
    out.extend_from_slice(&(slices.len() as u32).to_be_bytes());
    for (cpu, payload) in &slices {
        for field in [cpu.0, 0, offset, payload.len() as u32, 0] {
            out.extend_from_slice(&field.to_be_bytes());
        }
        offset += payload.len() as u32;
    }
    for (_, payload) in &slices {
        out.extend_from_slice(payload);
    }
    out
}

pub fn write_executable(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, bytes).expect("write fixture");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}

/// `<root>/Demo.app` holding one universal executable; returns its path.
pub fn demo_app(root: &Path) -> PathBuf {
    let binary = root.join("Demo.app").join("Contents").join("MacOS").join("Demo");
    write_executable(&binary, &universal_bytes());
    binary
}

/// `<root>/<name>.framework/Versions/{A,B}` with `Current -> B`; A holds 64 bytes.
#[cfg(unix)]
pub fn framework(root: &Path, name: &str) -> PathBuf {
    let framework = root.join(format!("{name}.framework"));
    let versions = framework.join("Versions");
    for (version, size) in [("A", 64usize), ("B", 16usize)] {
        let dir = versions.join(version);
        fs::create_dir_all(&dir).expect("create version");
        fs::write(dir.join(name), vec![0u8; size]).expect("write version binary");
    }
    std::os::unix::fs::symlink("B", versions.join("Current")).expect("symlink Current");
    framework
}
