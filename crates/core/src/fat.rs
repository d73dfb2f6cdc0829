//! Universal (fat) Mach-O container header parsing.
//!
//! A fat file starts with an 8-byte header `{magic, nfat_arch}` followed by
//! `nfat_arch` architecture records. All header fields are big-endian on disk
//! regardless of which magic is present; the magic only tells us whether the
//! records carry 32-bit or 64-bit offsets.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::arch::{select_slice, CpuType};

pub const FAT_MAGIC: u32 = 0xcafe_babe;
pub const FAT_CIGAM: u32 = 0xbeba_feca;
pub const FAT_MAGIC_64: u32 = 0xcafe_babf;
pub const FAT_CIGAM_64: u32 = 0xbfba_feca;

/// Size of `{magic, nfat_arch}`.
pub const FAT_HEADER_SIZE: u64 = 8;

/// Errors raised while decoding a container that did carry a fat magic.
#[derive(Debug, Error)]
pub enum FatError {
    /// Short read or other I/O failure while reading the header or slice table.
    #[error("failed to read fat header: {0}")]
    Io(#[from] io::Error),

    /// A slice table entry points past the end of the file.
    #[error("slice {index} ({offset}+{size}) exceeds file size {file_size}")]
    SliceOutOfBounds { index: usize, offset: u64, size: u64, file_size: u64 },

    /// Two slice table entries claim overlapping byte ranges.
    #[error("slices {first} and {second} overlap")]
    OverlappingSlices { first: usize, second: usize },
}

/// The four recognized encodings of the fat magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatVariant {
    Magic32,
    Cigam32,
    Magic64,
    Cigam64,
}

impl FatVariant {
    /// Recognize a magic value read big-endian from the first four file bytes.
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            FAT_MAGIC => Some(Self::Magic32),
            FAT_CIGAM => Some(Self::Cigam32),
            FAT_MAGIC_64 => Some(Self::Magic64),
            FAT_CIGAM_64 => Some(Self::Cigam64),
            _ => None,
        }
    }

    pub fn magic(self) -> u32 {
        match self {
            Self::Magic32 => FAT_MAGIC,
            Self::Cigam32 => FAT_CIGAM,
            Self::Magic64 => FAT_MAGIC_64,
            Self::Cigam64 => FAT_CIGAM_64,
        }
    }

    pub fn is_64(self) -> bool {
        matches!(self, Self::Magic64 | Self::Cigam64)
    }

    /// On-disk size of one architecture record (`fat_arch` / `fat_arch_64`).
    pub fn arch_record_size(self) -> u64 {
        if self.is_64() {
            32
        } else {
            20
        }
    }

    fn read_slice<R: Read>(self, reader: &mut R) -> io::Result<Slice> {
        let cpu_type = CpuType(reader.read_u32::<BigEndian>()?);
        let cpu_subtype = reader.read_u32::<BigEndian>()?;
        let (offset, size) = if self.is_64() {
            (reader.read_u64::<BigEndian>()?, reader.read_u64::<BigEndian>()?)
        } else {
            (u64::from(reader.read_u32::<BigEndian>()?), u64::from(reader.read_u32::<BigEndian>()?))
        };
        let align = reader.read_u32::<BigEndian>()?;
        if self.is_64() {
            // reserved
            reader.read_u32::<BigEndian>()?;
        }
        Ok(Slice { cpu_type, cpu_subtype, offset, size, align })
    }
}

/// One architecture-specific image inside a fat file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    pub cpu_type: CpuType,
    pub cpu_subtype: u32,
    /// Absolute byte offset within the container.
    pub offset: u64,
    /// Length of the image in bytes.
    pub size: u64,
    /// Alignment as a power of two.
    pub align: u32,
}

impl Slice {
    /// One past the last byte of the slice, or `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }

    pub fn arch_name(&self) -> &'static str {
        self.cpu_type.name_with_subtype(self.cpu_subtype)
    }
}

/// A fat file with two or more slices, eligible for thinning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatFile {
    pub path: PathBuf,
    /// Total size of the file when it was probed.
    pub size: u64,
    pub variant: FatVariant,
    pub slices: Vec<Slice>,
}

impl FatFile {
    pub fn has_arch(&self, cpu_type: CpuType) -> bool {
        self.slice_for(cpu_type).is_some()
    }

    pub fn slice_for(&self, cpu_type: CpuType) -> Option<&Slice> {
        select_slice(&self.slices, cpu_type)
    }
}

/// Result of looking at a file's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatProbe {
    /// No fat magic; an ordinary file or single-architecture binary.
    NotFat,
    /// Fat magic present but only one slice, so nothing to reclaim.
    SingleSlice(FatVariant),
    Fat(FatFile),
}

impl FatProbe {
    pub fn into_fat(self) -> Option<FatFile> {
        match self {
            FatProbe::Fat(fat) => Some(fat),
            _ => None,
        }
    }
}

/// Open `path` and probe it for a fat header.
pub fn probe_file(path: &Path) -> Result<FatProbe, FatError> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();
    probe(&mut file, path, file_size)
}

/// Probe a reader positioned anywhere; `file_size` bounds every slice.
pub fn probe<R: Read + Seek>(
    reader: &mut R,
    path: &Path,
    file_size: u64,
) -> Result<FatProbe, FatError> {
    reader.seek(SeekFrom::Start(0))?;
    let mut magic = [0u8; 4];
    match reader.read_exact(&mut magic) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(FatProbe::NotFat),
        Err(err) => return Err(err.into()),
    }
    let Some(variant) = FatVariant::from_magic(u32::from_be_bytes(magic)) else {
        return Ok(FatProbe::NotFat);
    };

    reader.seek(SeekFrom::Start(0))?;
    let _magic = reader.read_u32::<BigEndian>()?;
    let nfat_arch = reader.read_u32::<BigEndian>()?;
    trace!(path = %path.display(), ?variant, nfat_arch, "fat header");
    if nfat_arch <= 1 {
        return Ok(FatProbe::SingleSlice(variant));
    }

    // Records are read one at a time so a bogus count fails at EOF instead of
    // allocating for it up front.
    let mut slices = Vec::new();
    for _ in 0..nfat_arch {
        slices.push(variant.read_slice(reader)?);
    }
    validate_slices(&slices, file_size)?;

    debug!(
        path = %path.display(),
        slices = slices.len(),
        archs = ?slices.iter().map(Slice::arch_name).collect::<Vec<_>>(),
        "found fat binary"
    );
    Ok(FatProbe::Fat(FatFile { path: path.to_path_buf(), size: file_size, variant, slices }))
}

/// Check every slice lies inside the file and no two non-empty slices overlap.
pub fn validate_slices(slices: &[Slice], file_size: u64) -> Result<(), FatError> {
    for (index, slice) in slices.iter().enumerate() {
        match slice.end() {
            Some(end) if end <= file_size => {}
            _ => {
                return Err(FatError::SliceOutOfBounds {
                    index,
                    offset: slice.offset,
                    size: slice.size,
                    file_size,
                })
            }
        }
    }

    let mut order: Vec<usize> = (0..slices.len()).filter(|&i| slices[i].size > 0).collect();
    order.sort_by_key(|&i| slices[i].offset);
    for pair in order.windows(2) {
        let (prev, next) = (&slices[pair[0]], &slices[pair[1]]);
        // Bounds were checked above, so this cannot overflow.
        if next.offset < prev.offset + prev.size {
            return Err(FatError::OverlappingSlices {
                first: pair[0].min(pair[1]),
                second: pair[0].max(pair[1]),
            });
        }
    }
    Ok(())
}
