//! CPU architecture identifiers, host detection, and slice selection.

use std::fmt;

use goblin::mach::cputype;
use serde::{Deserialize, Serialize};

use crate::fat::Slice;

/// Capability bits stored in the high byte of a Mach-O cpu subtype.
const CPU_SUBTYPE_CAPABILITY_MASK: u32 = 0xff00_0000;

/// Mach-O cpu type code (`cpu_type_t`), already normalized to host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuType(pub u32);

impl CpuType {
    pub const X86: CpuType = CpuType(cputype::CPU_TYPE_X86);
    pub const X86_64: CpuType = CpuType(cputype::CPU_TYPE_X86_64);
    pub const ARM: CpuType = CpuType(cputype::CPU_TYPE_ARM);
    pub const ARM64: CpuType = CpuType(cputype::CPU_TYPE_ARM64);
    pub const POWERPC: CpuType = CpuType(cputype::CPU_TYPE_POWERPC);
    pub const POWERPC64: CpuType = CpuType(cputype::CPU_TYPE_POWERPC64);

    /// Parse a user-facing architecture name (`arm64`, `x86_64`, ...).
    ///
    /// Accepts both Apple spellings and Rust target spellings so the value of
    /// `std::env::consts::ARCH` round-trips.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "arm64" | "aarch64" | "arm64e" => Some(Self::ARM64),
            "x86_64" | "amd64" | "x86_64h" => Some(Self::X86_64),
            "i386" | "x86" | "i686" => Some(Self::X86),
            "arm" | "armv7" | "armv7s" => Some(Self::ARM),
            "ppc" | "powerpc" => Some(Self::POWERPC),
            "ppc64" | "powerpc64" => Some(Self::POWERPC64),
            _ => None,
        }
    }

    /// Short name for the cpu type, ignoring any subtype.
    pub fn name(self) -> &'static str {
        match self {
            Self::ARM64 => "arm64",
            Self::X86_64 => "x86_64",
            Self::X86 => "i386",
            Self::ARM => "arm",
            Self::POWERPC => "ppc",
            Self::POWERPC64 => "ppc64",
            _ => "unknown",
        }
    }

    /// Display name including the subtype when goblin knows it (`arm64e`, `x86_64h`).
    pub fn name_with_subtype(self, cpu_subtype: u32) -> &'static str {
        cputype::get_arch_name_from_types(self.0, cpu_subtype & !CPU_SUBTYPE_CAPABILITY_MASK)
            .unwrap_or_else(|| self.name())
    }
}

impl fmt::Display for CpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            "unknown" => write!(f, "{:#x}", self.0),
            name => f.write_str(name),
        }
    }
}

/// The architecture of the machine the tool is thinning for.
///
/// Computed once per run and passed explicitly to everything that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostArch {
    pub cpu_type: CpuType,
    /// Machine name as reported by the platform (`aarch64`, `x86_64`, ...).
    pub machine: String,
}

impl HostArch {
    pub fn new(cpu_type: CpuType, machine: impl Into<String>) -> Self {
        Self { cpu_type, machine: machine.into() }
    }

    /// Detect the architecture this binary was compiled for.
    ///
    /// An unrecognized architecture yields cpu type 0, which matches no slice,
    /// so nothing is ever stripped on such a host.
    pub fn detect() -> Self {
        let machine = std::env::consts::ARCH;
        let cpu_type = CpuType::from_name(machine).unwrap_or(CpuType(0));
        tracing::debug!(machine, cpu_type = cpu_type.0, "detected host architecture");
        Self::new(cpu_type, machine)
    }

    /// Build a host from an explicit architecture name (e.g. `--arch x86_64`).
    pub fn from_name(name: &str) -> Option<Self> {
        CpuType::from_name(name).map(|cpu_type| Self::new(cpu_type, name))
    }
}

impl fmt::Display for HostArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cpu_type, self.machine)
    }
}

/// Return the first slice built for `host`, in table order.
pub fn select_slice(slices: &[Slice], host: CpuType) -> Option<&Slice> {
    slices.iter().find(|slice| slice.cpu_type == host)
}
