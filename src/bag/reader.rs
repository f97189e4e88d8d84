// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Container navigator.
//!
//! `BagReader` drives the open protocol (preamble, bag header, trailing
//! index) and serves decompressed chunks on demand through a single-slot
//! cache, so a linear read pass touching the same chunk repeatedly pays
//! for decompression once.

use std::sync::Arc;

use crate::core::{BagError, Result, Time};

use super::decompress::DecompressorRegistry;
use super::record::{
    frame_expected, BagHeader, ChunkInfo, ChunkRecord, ConnectionRecord, IndexData, OP_BAG_HEADER,
    OP_CHUNK, OP_CHUNK_INFO, OP_CONNECTION, OP_INDEX_DATA,
};
use super::source::ByteSource;

/// The 13-byte bag v2.0 preamble.
pub const BAG_MAGIC: &[u8; 13] = b"#ROSBAG V2.0\n";

/// Read-ahead for the bag header record after the preamble.
const HEADER_READ_AHEAD: u64 = 4096;

/// A loaded chunk: decompressed data plus its index records.
#[derive(Debug)]
pub struct ChunkPayload {
    /// Decompressed chunk data (message and connection records)
    pub data: Vec<u8>,
    /// Per-connection index records following the chunk on disk
    pub indices: Vec<IndexData>,
}

/// Metadata produced by the open protocol.
#[derive(Debug)]
pub struct BagMetadata {
    /// The bag header record
    pub header: BagHeader,
    /// Connection records from the trailing index, in index order
    pub connections: Vec<ConnectionRecord>,
    /// Chunk infos from the trailing index, successor-linked
    pub chunk_infos: Vec<ChunkInfo>,
    /// Earliest chunk start time, None for an empty bag
    pub start_time: Option<Time>,
    /// Latest chunk end time, None for an empty bag
    pub end_time: Option<Time>,
}

/// Navigator over one bag source.
///
/// Owns the source and a single-slot cache of the most recently loaded
/// chunk. Not safe to share across concurrent callers without external
/// serialization.
#[derive(Debug)]
pub struct BagReader<S: ByteSource> {
    source: S,
    index_pos: u64,
    cache: Option<(u64, Arc<ChunkPayload>)>,
}

impl<S: ByteSource> BagReader<S> {
    /// Run the open protocol against a source.
    ///
    /// Verifies the preamble, frames the bag header, reads the trailing
    /// index in one I/O, links chunk successors, and aggregates the bag's
    /// time range.
    pub fn open(source: S) -> Result<(Self, BagMetadata)> {
        let size = source.size();
        if size < BAG_MAGIC.len() as u64 {
            return Err(BagError::TruncatedPreamble { size });
        }
        let magic = source.read(0, BAG_MAGIC.len() as u64)?;
        if magic != BAG_MAGIC {
            return Err(BagError::NotABag {
                found: String::from_utf8_lossy(&magic).into_owned(),
            });
        }

        let ahead = HEADER_READ_AHEAD.min(size - BAG_MAGIC.len() as u64);
        let head = source.read(BAG_MAGIC.len() as u64, ahead)?;
        let record = frame_expected(&head, BAG_MAGIC.len() as u64, OP_BAG_HEADER)?;
        let header = BagHeader::from_record(&record)?;

        if header.conn_count == 0 {
            tracing::debug!("opened empty bag");
            let reader = BagReader {
                source,
                index_pos: header.index_pos,
                cache: None,
            };
            return Ok((
                reader,
                BagMetadata {
                    header,
                    connections: Vec::new(),
                    chunk_infos: Vec::new(),
                    start_time: None,
                    end_time: None,
                },
            ));
        }

        if header.index_pos < BAG_MAGIC.len() as u64 || header.index_pos >= size {
            return Err(BagError::Other(format!(
                "bag has no usable trailing index (index_pos {} in a {size}-byte file)",
                header.index_pos
            )));
        }

        let tail = source.read(header.index_pos, size - header.index_pos)?;
        let mut pos = 0usize;

        let mut connections = Vec::with_capacity(header.conn_count as usize);
        for _ in 0..header.conn_count {
            let record =
                frame_expected(&tail[pos..], header.index_pos + pos as u64, OP_CONNECTION)?;
            pos += record.span.length as usize;
            connections.push(ConnectionRecord::from_record(&record)?);
        }

        let mut chunk_infos = Vec::with_capacity(header.chunk_count as usize);
        for _ in 0..header.chunk_count {
            let record =
                frame_expected(&tail[pos..], header.index_pos + pos as u64, OP_CHUNK_INFO)?;
            pos += record.span.length as usize;
            chunk_infos.push(ChunkInfo::from_record(&record)?);
        }

        // Link each chunk to its successor; the last chunk's on-disk span
        // is bounded by the index instead.
        for i in 0..chunk_infos.len() {
            chunk_infos[i].next_chunk_pos = chunk_infos.get(i + 1).map(|c| c.chunk_pos);
        }

        let start_time = chunk_infos.iter().map(|c| c.start_time).min();
        let end_time = chunk_infos.iter().map(|c| c.end_time).max();

        tracing::debug!(
            connections = connections.len(),
            chunks = chunk_infos.len(),
            "opened bag"
        );

        let reader = BagReader {
            source,
            index_pos: header.index_pos,
            cache: None,
        };
        Ok((
            reader,
            BagMetadata {
                header,
                connections,
                chunk_infos,
                start_time,
                end_time,
            },
        ))
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load a chunk and its index records, decompressing if needed.
    ///
    /// Serves from the single-slot cache when the same chunk is requested
    /// again; the cache is only populated on success.
    pub fn read_chunk(
        &mut self,
        info: &ChunkInfo,
        decompressors: &DecompressorRegistry,
    ) -> Result<Arc<ChunkPayload>> {
        if let Some((cached_pos, payload)) = &self.cache {
            if *cached_pos == info.chunk_pos {
                return Ok(Arc::clone(payload));
            }
        }

        let end = info.next_chunk_pos.unwrap_or(self.index_pos);
        if end <= info.chunk_pos {
            return Err(BagError::Other(format!(
                "chunk at {} has no on-disk span (next record at {end})",
                info.chunk_pos
            )));
        }
        let buf = self.source.read(info.chunk_pos, end - info.chunk_pos)?;

        let record = frame_expected(&buf, info.chunk_pos, OP_CHUNK)?;
        let chunk = ChunkRecord::from_record(&record)?;

        let data = if chunk.compression == "none" {
            chunk.data.to_vec()
        } else {
            let decompress = decompressors
                .get(&chunk.compression)
                .ok_or_else(|| BagError::unsupported_compression(&chunk.compression))?;
            decompress(chunk.data, chunk.uncompressed_size as usize)?
        };

        let mut indices = Vec::with_capacity(info.counts.len());
        let mut pos = record.span.length as usize;
        for _ in 0..info.counts.len() {
            let index_record =
                frame_expected(&buf[pos..], info.chunk_pos + pos as u64, OP_INDEX_DATA)?;
            pos += index_record.span.length as usize;
            indices.push(IndexData::from_record(&index_record)?);
        }

        let payload = Arc::new(ChunkPayload { data, indices });
        self.cache = Some((info.chunk_pos, Arc::clone(&payload)));
        Ok(payload)
    }
}
