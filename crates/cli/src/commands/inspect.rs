use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use thinner_core::fat::{probe_file, FatProbe, FatVariant};

#[derive(Debug, Serialize)]
pub struct InspectSlice {
    pub arch: String,
    pub cpu_type: u32,
    pub cpu_subtype: u32,
    pub offset: u64,
    pub size: u64,
    pub align: u32,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    /// `not_fat`, `single_slice` or `fat`.
    pub kind: &'static str,
    pub variant: Option<FatVariant>,
    pub size: Option<u64>,
    pub slices: Vec<InspectSlice>,
}

/// Probe a file and describe its slice table.
pub fn inspect_report(path: &Path) -> Result<InspectReport> {
    if !path.is_file() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }
    let probe = probe_file(path)
        .with_context(|| format!("Failed to parse fat header of {}", path.display()))?;

    let report = match probe {
        FatProbe::NotFat => InspectReport {
            path: path.to_path_buf(),
            kind: "not_fat",
            variant: None,
            size: None,
            slices: vec![],
        },
        FatProbe::SingleSlice(variant) => InspectReport {
            path: path.to_path_buf(),
            kind: "single_slice",
            variant: Some(variant),
            size: None,
            slices: vec![],
        },
        FatProbe::Fat(fat) => InspectReport {
            path: fat.path.clone(),
            kind: "fat",
            variant: Some(fat.variant),
            size: Some(fat.size),
            slices: fat
                .slices
                .iter()
                .map(|s| InspectSlice {
                    arch: s.arch_name().to_string(),
                    cpu_type: s.cpu_type.0,
                    cpu_subtype: s.cpu_subtype,
                    offset: s.offset,
                    size: s.size,
                    align: s.align,
                })
                .collect(),
        },
    };
    Ok(report)
}

/// Print the slice table of a file (human or JSON).
pub fn inspect_command(path: &str, json: bool) -> Result<()> {
    let report = inspect_report(Path::new(path))?;

    if json {
        let serialized = serde_json::to_string_pretty(&report)?;
        println!("{}", serialized);
        return Ok(());
    }

    match report.kind {
        "not_fat" => println!("{}: not a universal binary", report.path.display()),
        "single_slice" => {
            println!("{}: universal binary with a single slice", report.path.display())
        }
        _ => {
            println!("{}", report.path.display());
            if let Some(variant) = report.variant {
                let bits = if variant.is_64() { 64 } else { 32 };
                println!("  Format: fat ({bits}-bit offsets)");
            }
            if let Some(size) = report.size {
                println!("  Size: {}", crate::format_bytes(size));
            }
            println!("  Slices ({}):", report.slices.len());
            for slice in &report.slices {
                println!(
                    "  - {:<8} offset={:#x} size={} align=2^{}",
                    slice.arch, slice.offset, slice.size, slice.align
                );
            }
        }
    }

    Ok(())
}
