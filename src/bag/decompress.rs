// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chunk decompressor registry.
//!
//! Chunks are stored compressed under an algorithm named in the chunk
//! header. The reader dispatches to a registered decompressor of shape
//! `(compressed bytes, expected uncompressed size) -> bytes`; the default
//! registry covers the two algorithms bags use in practice, "bz2" and
//! "lz4". Uncompressed chunks ("none") never reach the registry.

use std::collections::HashMap;
use std::io::Read;

use crate::core::{BagError, Result};

/// A decompressor: `(compressed, expected_size) -> bytes`.
pub type DecompressFn = Box<dyn Fn(&[u8], usize) -> Result<Vec<u8>> + Send + Sync>;

/// Registry of chunk decompressors keyed by algorithm name.
pub struct DecompressorRegistry {
    entries: HashMap<String, DecompressFn>,
}

impl DecompressorRegistry {
    /// A registry with no algorithms registered.
    pub fn empty() -> Self {
        DecompressorRegistry {
            entries: HashMap::new(),
        }
    }

    /// Register a decompressor, replacing any existing entry.
    pub fn register<F>(&mut self, name: impl Into<String>, decompress: F)
    where
        F: Fn(&[u8], usize) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Box::new(decompress));
    }

    /// Look up a decompressor by algorithm name.
    pub fn get(&self, name: &str) -> Option<&DecompressFn> {
        self.entries.get(name)
    }

    /// Whether an algorithm is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl Default for DecompressorRegistry {
    /// The default registry: "bz2" and "lz4".
    fn default() -> Self {
        let mut registry = DecompressorRegistry::empty();
        registry.register("bz2", decompress_bz2);
        registry.register("lz4", decompress_lz4);
        registry
    }
}

impl std::fmt::Debug for DecompressorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DecompressorRegistry")
            .field("algorithms", &names)
            .finish()
    }
}

fn decompress_bz2(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = bzip2::read::BzDecoder::new(data);
    let mut out = Vec::with_capacity(expected_size);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| BagError::decompression("bz2", e.to_string()))?;
    if out.len() != expected_size {
        return Err(BagError::decompression(
            "bz2",
            format!("expected {expected_size} bytes, got {}", out.len()),
        ));
    }
    Ok(out)
}

fn decompress_lz4(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    lz4_flex::block::decompress(data, expected_size)
        .map_err(|e| BagError::decompression("lz4", e.to_string()))
}
