// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Byte-range sources.
//!
//! The container reader consumes only `read(offset, length)` and
//! `size()`; anything that can serve exact byte ranges can back a bag.

use std::fs::File;
use std::path::Path;

use crate::core::{BagError, Result};

/// A random-access byte range source.
///
/// `read` must deliver exactly `length` bytes or report failure.
pub trait ByteSource {
    /// Read exactly `length` bytes starting at `offset`.
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>>;

    /// Total size of the source in bytes.
    fn size(&self) -> u64;
}

/// Memory-mapped local file source.
#[derive(Debug)]
pub struct FileSource {
    mmap: memmap2::Mmap,
}

impl FileSource {
    /// Open and map a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| BagError::io(format!("failed to open {}: {e}", path.display())))?;
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| BagError::io(format!("failed to mmap {}: {e}", path.display())))?;
        Ok(FileSource { mmap })
    }
}

impl ByteSource for FileSource {
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        range_of(&self.mmap, offset, length).map(<[u8]>::to_vec)
    }

    fn size(&self) -> u64 {
        self.mmap.len() as u64
    }
}

/// In-memory blob source.
#[derive(Debug)]
pub struct BlobSource {
    data: Vec<u8>,
}

impl BlobSource {
    /// Wrap an owned byte buffer.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        BlobSource { data: data.into() }
    }
}

impl From<Vec<u8>> for BlobSource {
    fn from(data: Vec<u8>) -> Self {
        BlobSource::new(data)
    }
}

impl ByteSource for BlobSource {
    fn read(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        range_of(&self.data, offset, length).map(<[u8]>::to_vec)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

fn range_of(data: &[u8], offset: u64, length: u64) -> Result<&[u8]> {
    let end = offset
        .checked_add(length)
        .ok_or_else(|| BagError::io("read range overflows"))?;
    if end > data.len() as u64 {
        return Err(BagError::io(format!(
            "read of {length} bytes at offset {offset} past end of {}-byte source",
            data.len()
        )));
    }
    Ok(&data[offset as usize..end as usize])
}
