//! thinner-core
//!
//! Core library for reclaiming disk space from application bundles.
//!
//! Two mutations live here:
//! - Thinning universal (fat) Mach-O binaries down to the slice matching the
//!   host architecture (`fat` → `arch` → `strip`).
//! - Pruning framework versions that no `Versions/*` symlink points at
//!   (`versions` → `prune`).
//!
//! Everything a frontend needs (candidate scanning, orchestration, config)
//! is here too, so the CLI stays a thin wrapper and all behavior is testable
//! against synthetic files in temp directories.

pub mod arch;
pub mod config;
pub mod fat;
pub mod prune;
pub mod scan;
pub mod size;
pub mod strip;
pub mod thinner;
pub mod versions;

pub use arch::{select_slice, CpuType, HostArch};
pub use fat::{probe_file, FatFile, FatProbe, FatVariant, Slice};
pub use strip::{strip_binary, StripOptions, StripOutcome, StripReport, StripStrategy};
pub use thinner::{AppProgress, ThinOptions, ThinReport, Thinner};

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
