// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! The `Bag` facade.
//!
//! Opens a source, orchestrates the container reader, lazily compiles a
//! message codec per connection, and delivers [`ReadResult`]s to a
//! caller-supplied sink. Chunks are visited in bag-stored order and each
//! chunk's output is time-ordered; the facade never re-sorts across
//! chunks.

use std::collections::{HashMap, HashSet};

use crate::codec::MessageCodec;
use crate::core::{BagError, FieldMap, Result, Time};
use crate::schema::parse_message_definition;

use super::decompress::DecompressorRegistry;
use super::messages::read_chunk_messages;
use super::reader::{BagMetadata, BagReader};
use super::record::{BagHeader, ChunkInfo, ConnectionRecord};
use super::source::{BlobSource, ByteSource, FileSource};

/// Options for one read pass.
pub struct ReadOptions {
    /// Restrict to these topics; None reads every topic
    pub topics: Option<Vec<String>>,
    /// Inclusive window start; None means the beginning of time
    pub start_time: Option<Time>,
    /// Inclusive window end; None means the end of time
    pub end_time: Option<Time>,
    /// Decompressors for compressed chunks
    pub decompressors: DecompressorRegistry,
    /// Skip body decoding and deliver raw bytes only
    pub raw: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            topics: None,
            start_time: None,
            end_time: None,
            decompressors: DecompressorRegistry::default(),
            raw: false,
        }
    }
}

/// One message delivered to the sink.
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Topic of the producing connection
    pub topic: String,
    /// Decoded message body; None when reading raw
    pub message: Option<FieldMap>,
    /// Message receive time
    pub timestamp: Time,
    /// Raw serialized message bytes
    pub data: Vec<u8>,
    /// Index of the producing chunk in bag-stored order
    pub chunk_offset: usize,
    /// Number of chunks the read pass visits
    pub total_chunks: usize,
}

/// An open bag.
#[derive(Debug)]
pub struct Bag<S: ByteSource> {
    reader: BagReader<S>,
    header: BagHeader,
    connections: HashMap<u32, ConnectionRecord>,
    chunk_infos: Vec<ChunkInfo>,
    start_time: Option<Time>,
    end_time: Option<Time>,
    codecs: HashMap<u32, MessageCodec>,
}

impl Bag<FileSource> {
    /// Open a bag file from the local filesystem.
    pub fn open_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Bag::open(FileSource::open(path)?)
    }
}

impl Bag<BlobSource> {
    /// Open a bag held entirely in memory.
    pub fn open_blob(data: impl Into<Vec<u8>>) -> Result<Self> {
        Bag::open(BlobSource::new(data))
    }
}

impl<S: ByteSource> Bag<S> {
    /// Open a bag over an injected source.
    pub fn open(source: S) -> Result<Self> {
        let (reader, metadata) = BagReader::open(source)?;
        let BagMetadata {
            header,
            connections,
            chunk_infos,
            start_time,
            end_time,
        } = metadata;
        Ok(Bag {
            reader,
            header,
            connections: connections.into_iter().map(|c| (c.conn, c)).collect(),
            chunk_infos,
            start_time,
            end_time,
            codecs: HashMap::new(),
        })
    }

    /// The bag header record.
    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    /// Connections by id.
    pub fn connections(&self) -> &HashMap<u32, ConnectionRecord> {
        &self.connections
    }

    /// Chunk infos in bag-stored order.
    pub fn chunk_infos(&self) -> &[ChunkInfo] {
        &self.chunk_infos
    }

    /// Earliest chunk start time; None for an empty bag.
    pub fn start_time(&self) -> Option<Time> {
        self.start_time
    }

    /// Latest chunk end time; None for an empty bag.
    pub fn end_time(&self) -> Option<Time> {
        self.end_time
    }

    /// Distinct topic names, sorted.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self
            .connections
            .values()
            .map(|c| c.topic.as_str())
            .collect();
        topics.sort_unstable();
        topics.dedup();
        topics
    }

    /// Total message count across all chunks, from the index.
    pub fn message_count(&self) -> u64 {
        self.chunk_infos.iter().map(ChunkInfo::message_count).sum()
    }

    /// The compiled codec for a connection, building it on first use.
    pub fn connection_codec(&mut self, conn: u32) -> Result<&MessageCodec> {
        let record = self
            .connections
            .get(&conn)
            .ok_or(BagError::UnknownConnection { conn })?;
        if !self.codecs.contains_key(&conn) {
            let definitions = parse_message_definition(&record.message_definition)?;
            self.codecs.insert(conn, MessageCodec::new(&definitions)?);
        }
        Ok(&self.codecs[&conn])
    }

    /// Stream messages through `sink`, filtered by topic and time window.
    ///
    /// Within each chunk messages arrive in non-decreasing time order.
    /// Chunks are visited in bag-stored order; when chunk time ranges
    /// overlap this is not a global time order, and the facade does not
    /// re-sort.
    pub fn read_messages<F>(&mut self, options: &ReadOptions, mut sink: F) -> Result<()>
    where
        F: FnMut(ReadResult) -> Result<()>,
    {
        let allowed: Option<HashSet<u32>> = options.topics.as_ref().map(|topics| {
            let wanted: HashSet<&str> = topics.iter().map(String::as_str).collect();
            self.connections
                .values()
                .filter(|c| wanted.contains(c.topic.as_str()))
                .map(|c| c.conn)
                .collect()
        });
        let start = options.start_time.unwrap_or(Time::ZERO);
        let end = options.end_time.unwrap_or(Time::MAX);
        let total_chunks = self.chunk_infos.len();

        for chunk_offset in 0..self.chunk_infos.len() {
            {
                let info = &self.chunk_infos[chunk_offset];
                if info.end_time < start || info.start_time > end {
                    continue;
                }
                if let Some(allowed) = &allowed {
                    if !info.counts.iter().any(|c| allowed.contains(&c.conn)) {
                        continue;
                    }
                }
            }

            let payload = self
                .reader
                .read_chunk(&self.chunk_infos[chunk_offset], &options.decompressors)?;

            for item in read_chunk_messages(&payload, allowed.as_ref(), start, end) {
                let message_data = item?;
                let conn = message_data.conn;
                let record = self
                    .connections
                    .get(&conn)
                    .ok_or(BagError::UnknownConnection { conn })?;

                let message = if options.raw {
                    None
                } else {
                    if !self.codecs.contains_key(&conn) {
                        let definitions = parse_message_definition(&record.message_definition)?;
                        self.codecs.insert(conn, MessageCodec::new(&definitions)?);
                    }
                    Some(self.codecs[&conn].decode(message_data.data)?)
                };

                sink(ReadResult {
                    topic: record.topic.clone(),
                    message,
                    timestamp: message_data.time,
                    data: message_data.data.to_vec(),
                    chunk_offset,
                    total_chunks,
                })?;
            }
        }
        Ok(())
    }
}
