// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.
//!
//! `BagBuilder` assembles a complete, indexed bag v2.0 byte stream in
//! memory: preamble, bag header, chunk + index records, and the trailing
//! connection/chunk-info block.

#![allow(dead_code)]

use std::io::Read;

use bagcodec::bag::{
    encode_fields, HeaderFields, OP_BAG_HEADER, OP_CHUNK, OP_CHUNK_INFO, OP_CONNECTION,
    OP_INDEX_DATA, OP_MESSAGE_DATA,
};
use bagcodec::Time;

/// One declared connection.
pub struct ConnSpec {
    pub conn: u32,
    pub topic: String,
    pub message_type: String,
    pub definition: String,
    pub caller_id: Option<String>,
    pub latching: bool,
}

impl ConnSpec {
    pub fn new(conn: u32, topic: &str, message_type: &str, definition: &str) -> Self {
        ConnSpec {
            conn,
            topic: topic.to_string(),
            message_type: message_type.to_string(),
            definition: definition.to_string(),
            caller_id: None,
            latching: false,
        }
    }
}

/// Chunk compression choices the builder supports.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Bz2,
}

/// One chunk: messages in write order.
pub struct ChunkSpec {
    pub compression: Compression,
    pub messages: Vec<(u32, Time, Vec<u8>)>,
}

impl ChunkSpec {
    pub fn new(messages: Vec<(u32, Time, Vec<u8>)>) -> Self {
        ChunkSpec {
            compression: Compression::None,
            messages,
        }
    }

    pub fn bz2(messages: Vec<(u32, Time, Vec<u8>)>) -> Self {
        ChunkSpec {
            compression: Compression::Bz2,
            messages,
        }
    }
}

/// In-memory bag assembler.
#[derive(Default)]
pub struct BagBuilder {
    connections: Vec<ConnSpec>,
    chunks: Vec<ChunkSpec>,
}

impl BagBuilder {
    pub fn new() -> Self {
        BagBuilder::default()
    }

    pub fn connection(mut self, conn: ConnSpec) -> Self {
        self.connections.push(conn);
        self
    }

    pub fn chunk(mut self, chunk: ChunkSpec) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// Assemble the complete bag byte stream.
    pub fn build(self) -> Vec<u8> {
        let conn_count = self.connections.len() as u32;
        let chunk_count = self.chunks.len() as u32;

        // The bag header's framed length does not depend on its field
        // values, so a stub sizes the layout and the real one replaces it.
        let header_stub = bag_header_record(0, conn_count, chunk_count);

        struct ChunkMeta {
            chunk_pos: u64,
            start: Time,
            end: Time,
            counts: Vec<(u32, u32)>,
        }

        let mut chunk_bytes = Vec::new();
        let mut metas = Vec::new();

        for spec in &self.chunks {
            let chunk_pos = 13 + header_stub.len() as u64 + chunk_bytes.len() as u64;

            // Uncompressed chunk payload: message records back to back,
            // with per-connection (time, offset) entries as we go.
            let mut payload = Vec::new();
            let mut per_conn: Vec<(u32, Vec<(Time, u32)>)> = Vec::new();
            for (conn, time, body) in &spec.messages {
                let offset = payload.len() as u32;
                payload.extend_from_slice(&message_record(*conn, *time, body));
                match per_conn.iter_mut().find(|(c, _)| c == conn) {
                    Some((_, entries)) => entries.push((*time, offset)),
                    None => per_conn.push((*conn, vec![(*time, offset)])),
                }
            }

            let (compression, stored) = match spec.compression {
                Compression::None => ("none", payload.clone()),
                Compression::Bz2 => ("bz2", bz2_compress(&payload)),
            };

            let mut fields = HeaderFields::new();
            fields.insert_u8("op", OP_CHUNK);
            fields.insert_str("compression", compression);
            fields.insert_u32("size", payload.len() as u32);
            chunk_bytes.extend_from_slice(&record(&fields, &stored));

            let mut counts = Vec::new();
            for (conn, entries) in &mut per_conn {
                entries.sort_by_key(|(time, _)| *time);
                counts.push((*conn, entries.len() as u32));

                let mut data = Vec::new();
                for (time, offset) in entries.iter() {
                    data.extend_from_slice(&time.sec.to_le_bytes());
                    data.extend_from_slice(&time.nsec.to_le_bytes());
                    data.extend_from_slice(&offset.to_le_bytes());
                }
                let mut fields = HeaderFields::new();
                fields.insert_u8("op", OP_INDEX_DATA);
                fields.insert_u32("ver", 1);
                fields.insert_u32("conn", *conn);
                fields.insert_u32("count", entries.len() as u32);
                chunk_bytes.extend_from_slice(&record(&fields, &data));
            }

            let start = spec.messages.iter().map(|(_, t, _)| *t).min().unwrap_or(Time::ZERO);
            let end = spec.messages.iter().map(|(_, t, _)| *t).max().unwrap_or(Time::ZERO);
            metas.push(ChunkMeta {
                chunk_pos,
                start,
                end,
                counts,
            });
        }

        let index_pos = 13 + header_stub.len() as u64 + chunk_bytes.len() as u64;

        let mut tail = Vec::new();
        for conn in &self.connections {
            let mut fields = HeaderFields::new();
            fields.insert_u8("op", OP_CONNECTION);
            fields.insert_u32("conn", conn.conn);
            fields.insert_str("topic", &conn.topic);

            let mut data_fields = HeaderFields::new();
            data_fields.insert_str("type", &conn.message_type);
            data_fields.insert_str("md5sum", "0123456789abcdef0123456789abcdef");
            data_fields.insert_str("message_definition", &conn.definition);
            if let Some(caller_id) = &conn.caller_id {
                data_fields.insert_str("callerid", caller_id);
            }
            if conn.latching {
                data_fields.insert_str("latching", "1");
            }
            tail.extend_from_slice(&record(&fields, &encode_fields(&data_fields)));
        }

        for meta in &metas {
            let mut fields = HeaderFields::new();
            fields.insert_u8("op", OP_CHUNK_INFO);
            fields.insert_u32("ver", 1);
            fields.insert_u64("chunk_pos", meta.chunk_pos);
            fields.insert_time("start_time", meta.start);
            fields.insert_time("end_time", meta.end);
            fields.insert_u32("count", meta.counts.len() as u32);

            let mut data = Vec::new();
            for (conn, count) in &meta.counts {
                data.extend_from_slice(&conn.to_le_bytes());
                data.extend_from_slice(&count.to_le_bytes());
            }
            tail.extend_from_slice(&record(&fields, &data));
        }

        let mut out = b"#ROSBAG V2.0\n".to_vec();
        out.extend_from_slice(&bag_header_record(index_pos, conn_count, chunk_count));
        out.extend_from_slice(&chunk_bytes);
        out.extend_from_slice(&tail);
        out
    }
}

/// Frame one record: header length, header fields, data length, data.
pub fn record(fields: &HeaderFields, data: &[u8]) -> Vec<u8> {
    let header = encode_fields(fields);
    let mut out = (header.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&header);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// Build a message data record.
pub fn message_record(conn: u32, time: Time, body: &[u8]) -> Vec<u8> {
    let mut fields = HeaderFields::new();
    fields.insert_u8("op", OP_MESSAGE_DATA);
    fields.insert_u32("conn", conn);
    fields.insert_time("time", time);
    record(&fields, body)
}

fn bag_header_record(index_pos: u64, conn_count: u32, chunk_count: u32) -> Vec<u8> {
    let mut fields = HeaderFields::new();
    fields.insert_u8("op", OP_BAG_HEADER);
    fields.insert_u64("index_pos", index_pos);
    fields.insert_u32("conn_count", conn_count);
    fields.insert_u32("chunk_count", chunk_count);
    // Real bags pad the header record to a fixed size; a token padding
    // block keeps the layout honest without the bulk.
    record(&fields, &[0u8; 16])
}

fn bz2_compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::read::BzEncoder::new(data, bzip2::Compression::default());
    let mut out = Vec::new();
    encoder.read_to_end(&mut out).expect("bz2 compression");
    out
}
