// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Record framer and typed record kinds.
//!
//! Every bag record follows `<u32 header_len><header fields><u32
//! data_len><data>`. The framer extracts one record from a byte window,
//! classifies it by the `op` header field, and assigns the record's file
//! offsets. Typed constructors then decode the kind-specific header
//! fields and data blocks.
//!
//! Op codes:
//! - 0x02: Message data
//! - 0x03: Bag header
//! - 0x04: Index data
//! - 0x05: Chunk
//! - 0x06: Chunk info
//! - 0x07: Connection

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{BagError, Result, Time};

use super::fields::{extract_fields, HeaderFields};

/// Message data record opcode.
pub const OP_MESSAGE_DATA: u8 = 0x02;
/// Bag header record opcode.
pub const OP_BAG_HEADER: u8 = 0x03;
/// Index data record opcode.
pub const OP_INDEX_DATA: u8 = 0x04;
/// Chunk record opcode.
pub const OP_CHUNK: u8 = 0x05;
/// Chunk info record opcode.
pub const OP_CHUNK_INFO: u8 = 0x06;
/// Connection record opcode.
pub const OP_CONNECTION: u8 = 0x07;

/// File offsets assigned by the framer; part of a record's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    /// Start of the record within the file
    pub offset: u64,
    /// Start of the data block
    pub data_offset: u64,
    /// One past the last byte of the record
    pub end: u64,
    /// Total record length in bytes
    pub length: u64,
}

/// A framed but not yet typed record.
#[derive(Debug)]
pub struct RawRecord<'a> {
    /// Opcode from the header fields
    pub op: u8,
    /// Decoded header fields
    pub fields: HeaderFields,
    /// The data block
    pub data: &'a [u8],
    /// Assigned offsets
    pub span: RecordSpan,
}

/// Frame one record at the start of `buf`.
///
/// `file_offset` is the position of `buf[0]` within the file and seeds
/// the record's span.
pub fn frame_record(buf: &[u8], file_offset: u64) -> Result<RawRecord<'_>> {
    if buf.len() < 4 {
        return Err(BagError::truncated_record("record header length", 4, buf.len()));
    }
    let header_len =
        u32::from_le_bytes(buf[..4].try_into().expect("length checked")) as usize;

    let data_len_at = 4 + header_len;
    if buf.len() < data_len_at + 4 {
        return Err(BagError::truncated_record(
            "record header",
            data_len_at + 4,
            buf.len(),
        ));
    }
    let fields = extract_fields(&buf[4..data_len_at])?;
    let op = fields.req_u8("op")?;

    let data_len = u32::from_le_bytes(
        buf[data_len_at..data_len_at + 4]
            .try_into()
            .expect("length checked"),
    ) as usize;
    let total = data_len_at + 4 + data_len;
    if buf.len() < total {
        return Err(BagError::truncated_record("record data", total, buf.len()));
    }
    let data = &buf[data_len_at + 4..total];

    Ok(RawRecord {
        op,
        fields,
        data,
        span: RecordSpan {
            offset: file_offset,
            data_offset: file_offset + (data_len_at + 4) as u64,
            end: file_offset + total as u64,
            length: total as u64,
        },
    })
}

/// Frame one record and require a specific opcode.
pub fn frame_expected(buf: &[u8], file_offset: u64, expected_op: u8) -> Result<RawRecord<'_>> {
    let record = frame_record(buf, file_offset)?;
    if record.op != expected_op {
        return Err(BagError::UnexpectedRecordKind {
            expected: expected_op,
            actual: record.op,
        });
    }
    Ok(record)
}

/// The bag header record: locates the trailing index.
#[derive(Debug, Clone)]
pub struct BagHeader {
    /// Offset of the first record of the trailing index
    pub index_pos: u64,
    /// Number of Connection records in the index
    pub conn_count: u32,
    /// Number of ChunkInfo records in the index
    pub chunk_count: u32,
    /// Assigned offsets
    pub span: RecordSpan,
}

impl BagHeader {
    /// Decode from a framed record (data block is padding, ignored).
    pub fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        Ok(BagHeader {
            index_pos: record.fields.req_u64("index_pos")?,
            conn_count: record.fields.req_u32("conn_count")?,
            chunk_count: record.fields.req_u32("chunk_count")?,
            span: record.span,
        })
    }
}

/// A chunk record: compressed group of message and connection records.
#[derive(Debug)]
pub struct ChunkRecord<'a> {
    /// Compression algorithm name ("none", "bz2", "lz4", ...)
    pub compression: String,
    /// Declared uncompressed payload size
    pub uncompressed_size: u32,
    /// The compressed payload
    pub data: &'a [u8],
    /// Assigned offsets
    pub span: RecordSpan,
}

impl<'a> ChunkRecord<'a> {
    /// Decode from a framed record.
    pub fn from_record(record: &RawRecord<'a>) -> Result<Self> {
        Ok(ChunkRecord {
            compression: record.fields.req_str("compression")?,
            uncompressed_size: record.fields.req_u32("size")?,
            data: record.data,
            span: record.span,
        })
    }
}

/// One entry of an IndexData record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Message receive time
    pub time: Time,
    /// Message record offset relative to the chunk's data start
    pub offset: u32,
}

/// Per-connection message index for one chunk.
#[derive(Debug, Clone)]
pub struct IndexData {
    /// Index format version
    pub ver: u32,
    /// Connection id the entries belong to
    pub conn: u32,
    /// Time-sorted entries
    pub entries: Vec<IndexEntry>,
    /// Assigned offsets
    pub span: RecordSpan,
}

impl IndexData {
    /// Decode from a framed record, including the packed 12-byte tuples.
    pub fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        let count = record.fields.req_u32("count")? as usize;
        let needed = count * 12;
        if record.data.len() < needed {
            return Err(BagError::truncated_record(
                "index data entries",
                needed,
                record.data.len(),
            ));
        }

        let mut cursor = Cursor::new(record.data);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let sec = cursor.read_u32::<LittleEndian>()?;
            let nsec = cursor.read_u32::<LittleEndian>()?;
            let offset = cursor.read_u32::<LittleEndian>()?;
            entries.push(IndexEntry {
                time: Time::new(sec, nsec),
                offset,
            });
        }

        Ok(IndexData {
            ver: record.fields.req_u32("ver")?,
            conn: record.fields.req_u32("conn")?,
            entries,
            span: record.span,
        })
    }
}

/// Per-connection message count inside one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnCount {
    /// Connection id
    pub conn: u32,
    /// Messages of that connection in the chunk
    pub count: u32,
}

/// Chunk metadata stored in the trailing index.
#[derive(Debug, Clone)]
pub struct ChunkInfo {
    /// Chunk info format version
    pub ver: u32,
    /// File offset of the chunk record
    pub chunk_pos: u64,
    /// Earliest message time in the chunk
    pub start_time: Time,
    /// Latest message time in the chunk
    pub end_time: Time,
    /// Per-connection message counts
    pub counts: Vec<ConnCount>,
    /// Assigned offsets
    pub span: RecordSpan,
    /// File offset of the next chunk, filled in when the index is linked.
    /// The gap to the successor (or to the index for the last chunk) is
    /// the chunk's on-disk byte span including its index records.
    pub next_chunk_pos: Option<u64>,
}

impl ChunkInfo {
    /// Decode from a framed record, including the packed 8-byte tuples.
    pub fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        let count = record.fields.req_u32("count")? as usize;
        let needed = count * 8;
        if record.data.len() < needed {
            return Err(BagError::truncated_record(
                "chunk info counts",
                needed,
                record.data.len(),
            ));
        }

        let mut cursor = Cursor::new(record.data);
        let mut counts = Vec::with_capacity(count);
        for _ in 0..count {
            counts.push(ConnCount {
                conn: cursor.read_u32::<LittleEndian>()?,
                count: cursor.read_u32::<LittleEndian>()?,
            });
        }

        let start_time = record.fields.req_time("start_time")?;
        let end_time = record.fields.req_time("end_time")?;
        if start_time > end_time {
            tracing::warn!(%start_time, %end_time, "chunk info with start_time after end_time");
        }

        Ok(ChunkInfo {
            ver: record.fields.req_u32("ver")?,
            chunk_pos: record.fields.req_u64("chunk_pos")?,
            start_time,
            end_time,
            counts,
            span: record.span,
            next_chunk_pos: None,
        })
    }

    /// Total messages in the chunk across all connections.
    pub fn message_count(&self) -> u64 {
        self.counts.iter().map(|c| c.count as u64).sum()
    }
}

/// A connection: binds a numeric id to a topic and its schema.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    /// Connection id
    pub conn: u32,
    /// Topic name
    pub topic: String,
    /// Message type name (e.g. "std_msgs/Header")
    pub message_type: String,
    /// MD5 sum of the message definition
    pub md5sum: String,
    /// The textual message definition
    pub message_definition: String,
    /// Publishing node, when recorded
    pub caller_id: Option<String>,
    /// Whether the topic was latching
    pub latching: bool,
    /// Assigned offsets
    pub span: RecordSpan,
}

impl ConnectionRecord {
    /// Decode from a framed record. The data block is a nested
    /// header-field blob carrying the schema fields.
    pub fn from_record(record: &RawRecord<'_>) -> Result<Self> {
        let data_fields = extract_fields(record.data)?;
        Ok(ConnectionRecord {
            conn: record.fields.req_u32("conn")?,
            topic: record.fields.req_str("topic")?,
            message_type: data_fields.req_str("type")?,
            md5sum: data_fields.req_str("md5sum")?,
            message_definition: data_fields.req_str("message_definition")?,
            caller_id: data_fields.opt_str("callerid"),
            latching: data_fields.opt_str("latching").as_deref() == Some("1"),
            span: record.span,
        })
    }
}

/// A timestamped serialized message.
#[derive(Debug)]
pub struct MessageData<'a> {
    /// Connection id
    pub conn: u32,
    /// Receive time
    pub time: Time,
    /// Raw serialized message bytes
    pub data: &'a [u8],
    /// Assigned offsets
    pub span: RecordSpan,
}

impl<'a> MessageData<'a> {
    /// Decode from a framed record.
    pub fn from_record(record: &RawRecord<'a>) -> Result<Self> {
        Ok(MessageData {
            conn: record.fields.req_u32("conn")?,
            time: record.fields.req_time("time")?,
            data: record.data,
            span: record.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::fields::encode_fields;

    fn build_record(fields: &HeaderFields, data: &[u8]) -> Vec<u8> {
        let header = encode_fields(fields);
        let mut out = (header.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&header);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_frame_record_spans() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_MESSAGE_DATA);
        fields.insert_u32("conn", 1);
        fields.insert_time("time", Time::new(2, 3));
        let buf = build_record(&fields, b"payload");

        let record = frame_record(&buf, 100).unwrap();
        assert_eq!(record.op, OP_MESSAGE_DATA);
        assert_eq!(record.data, b"payload");
        assert_eq!(record.span.offset, 100);
        assert_eq!(record.span.length, buf.len() as u64);
        assert_eq!(record.span.end, 100 + buf.len() as u64);
        assert_eq!(record.span.data_offset, record.span.end - 7);
    }

    #[test]
    fn test_frame_expected_rejects_wrong_op() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_MESSAGE_DATA);
        let buf = build_record(&fields, &[]);
        let err = frame_expected(&buf, 0, OP_CHUNK).unwrap_err();
        assert!(matches!(
            err,
            BagError::UnexpectedRecordKind {
                expected: OP_CHUNK,
                actual: OP_MESSAGE_DATA
            }
        ));
    }

    #[test]
    fn test_frame_truncated() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_CHUNK);
        let buf = build_record(&fields, b"data");
        let err = frame_record(&buf[..buf.len() - 2], 0).unwrap_err();
        assert!(matches!(err, BagError::TruncatedRecord { .. }));
    }

    #[test]
    fn test_missing_op_field() {
        let mut fields = HeaderFields::new();
        fields.insert_u32("conn", 1);
        let buf = build_record(&fields, &[]);
        let err = frame_record(&buf, 0).unwrap_err();
        assert!(matches!(err, BagError::MissingRequiredField { .. }));
    }

    #[test]
    fn test_bag_header_record() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_BAG_HEADER);
        fields.insert_u64("index_pos", 12345);
        fields.insert_u32("conn_count", 2);
        fields.insert_u32("chunk_count", 3);
        let buf = build_record(&fields, &[0; 64]);

        let record = frame_expected(&buf, 13, OP_BAG_HEADER).unwrap();
        let header = BagHeader::from_record(&record).unwrap();
        assert_eq!(header.index_pos, 12345);
        assert_eq!(header.conn_count, 2);
        assert_eq!(header.chunk_count, 3);
    }

    #[test]
    fn test_index_data_record() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_INDEX_DATA);
        fields.insert_u32("ver", 1);
        fields.insert_u32("conn", 7);
        fields.insert_u32("count", 2);

        let mut data = Vec::new();
        for (sec, nsec, offset) in [(1u32, 2u32, 0u32), (3, 4, 50)] {
            data.extend_from_slice(&sec.to_le_bytes());
            data.extend_from_slice(&nsec.to_le_bytes());
            data.extend_from_slice(&offset.to_le_bytes());
        }
        let buf = build_record(&fields, &data);

        let record = frame_expected(&buf, 0, OP_INDEX_DATA).unwrap();
        let index = IndexData::from_record(&record).unwrap();
        assert_eq!(index.conn, 7);
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries[1].time, Time::new(3, 4));
        assert_eq!(index.entries[1].offset, 50);
    }

    #[test]
    fn test_chunk_info_record() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_CHUNK_INFO);
        fields.insert_u32("ver", 1);
        fields.insert_u64("chunk_pos", 4242);
        fields.insert_time("start_time", Time::new(1, 0));
        fields.insert_time("end_time", Time::new(9, 0));
        fields.insert_u32("count", 2);

        let mut data = Vec::new();
        for (conn, count) in [(0u32, 5u32), (1, 7)] {
            data.extend_from_slice(&conn.to_le_bytes());
            data.extend_from_slice(&count.to_le_bytes());
        }
        let buf = build_record(&fields, &data);

        let record = frame_expected(&buf, 0, OP_CHUNK_INFO).unwrap();
        let info = ChunkInfo::from_record(&record).unwrap();
        assert_eq!(info.chunk_pos, 4242);
        assert_eq!(info.counts.len(), 2);
        assert_eq!(info.message_count(), 12);
        assert_eq!(info.next_chunk_pos, None);
    }

    #[test]
    fn test_connection_record() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_CONNECTION);
        fields.insert_u32("conn", 0);
        fields.insert_str("topic", "/turtle1/pose");

        let mut data_fields = HeaderFields::new();
        data_fields.insert_str("type", "turtlesim/Pose");
        data_fields.insert_str("md5sum", "863b248d5016ca62ea2e895ae5265cf9");
        data_fields.insert_str("message_definition", "float32 x\nfloat32 y\n");
        data_fields.insert_str("callerid", "/sim");
        data_fields.insert_str("latching", "1");
        let buf = build_record(&fields, &encode_fields(&data_fields));

        let record = frame_expected(&buf, 0, OP_CONNECTION).unwrap();
        let conn = ConnectionRecord::from_record(&record).unwrap();
        assert_eq!(conn.conn, 0);
        assert_eq!(conn.topic, "/turtle1/pose");
        assert_eq!(conn.message_type, "turtlesim/Pose");
        assert_eq!(conn.caller_id.as_deref(), Some("/sim"));
        assert!(conn.latching);
    }

    #[test]
    fn test_connection_missing_definition_fails() {
        let mut fields = HeaderFields::new();
        fields.insert_u8("op", OP_CONNECTION);
        fields.insert_u32("conn", 0);
        fields.insert_str("topic", "/t");

        let mut data_fields = HeaderFields::new();
        data_fields.insert_str("type", "pkg/T");
        data_fields.insert_str("md5sum", "x");
        let buf = build_record(&fields, &encode_fields(&data_fields));

        let record = frame_expected(&buf, 0, OP_CONNECTION).unwrap();
        let err = ConnectionRecord::from_record(&record).unwrap_err();
        assert!(matches!(err, BagError::MissingRequiredField { .. }));
    }
}
