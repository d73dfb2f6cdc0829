//! Destructive thinning of a fat file down to one slice.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::fat::Slice;

#[derive(Debug, Error)]
pub enum StripError {
    #[error("I/O error while stripping: {0}")]
    Io(#[from] io::Error),

    /// The file holds fewer bytes at the slice offset than the table claims.
    /// Nothing has been written when this is returned.
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead { offset: u64, expected: u64, actual: u64 },
}

/// How the thinned bytes are put back on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripStrategy {
    /// Truncate the original file and write the slice into it.
    ///
    /// Keeps the inode, but a crash between truncate and write leaves an
    /// empty file.
    #[default]
    InPlace,
    /// Write the slice to a sibling temp file, fsync it, and rename it over
    /// the original. The file gets a new inode.
    AtomicRename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StripOptions {
    pub dry_run: bool,
    pub strategy: StripStrategy,
}

/// Sizes before and after thinning one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripReport {
    pub original_size: u64,
    pub new_size: u64,
    pub dry_run: bool,
}

impl StripReport {
    pub fn saved(&self) -> u64 {
        self.original_size.saturating_sub(self.new_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripOutcome {
    /// The host architecture is not in the file; it was left alone.
    NoMatch,
    Stripped(StripReport),
}

impl StripOutcome {
    pub fn saved(&self) -> u64 {
        match self {
            StripOutcome::NoMatch => 0,
            StripOutcome::Stripped(report) => report.saved(),
        }
    }
}

/// Rewrite `path` so it contains only `slice`.
///
/// `original_size` is the size recorded when the file was probed. With
/// `dry_run` the slice is still read to prove it is intact, but the file is
/// opened read-only and never modified.
pub fn strip_binary(
    path: &Path,
    original_size: u64,
    slice: Option<&Slice>,
    options: &StripOptions,
) -> Result<StripOutcome, StripError> {
    let Some(slice) = slice else {
        debug!(path = %path.display(), "host architecture not present, leaving file untouched");
        return Ok(StripOutcome::NoMatch);
    };

    if options.dry_run {
        let mut file = File::open(path)?;
        let data = read_slice(&mut file, slice)?;
        return Ok(StripOutcome::Stripped(StripReport {
            original_size,
            new_size: data.len() as u64,
            dry_run: true,
        }));
    }

    let new_size = match options.strategy {
        StripStrategy::InPlace => rewrite_in_place(path, slice)?,
        StripStrategy::AtomicRename => rewrite_via_rename(path, slice)?,
    };
    info!(
        path = %path.display(),
        arch = slice.arch_name(),
        original_size,
        new_size,
        "stripped fat binary"
    );
    Ok(StripOutcome::Stripped(StripReport { original_size, new_size, dry_run: false }))
}

/// Read exactly `slice.size` bytes at `slice.offset`.
fn read_slice<R: Read + Seek>(reader: &mut R, slice: &Slice) -> Result<Vec<u8>, StripError> {
    reader.seek(SeekFrom::Start(slice.offset))?;
    let mut data = Vec::new();
    reader.by_ref().take(slice.size).read_to_end(&mut data)?;
    let actual = data.len() as u64;
    if actual != slice.size {
        return Err(StripError::ShortRead { offset: slice.offset, expected: slice.size, actual });
    }
    Ok(data)
}

fn rewrite_in_place(path: &Path, slice: &Slice) -> Result<u64, StripError> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let data = read_slice(&mut file, slice)?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&data)?;
    Ok(data.len() as u64)
}

fn rewrite_via_rename(path: &Path, slice: &Slice) -> Result<u64, StripError> {
    let data = {
        let mut file = File::open(path)?;
        read_slice(&mut file, slice)?
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)?.permissions();

    let mut tmp = tempfile::Builder::new().prefix(".thin-").tempfile_in(parent)?;
    tmp.write_all(&data)?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(data.len() as u64)
}
