// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag v2.0 container support.
//!
//! Layering, leaf first: the header-field codec, the record framer, byte
//! sources and the decompressor registry, the container reader with its
//! chunk cache, the in-chunk merge iterator, and the [`Bag`] facade.

pub mod decompress;
pub mod facade;
pub mod fields;
pub mod messages;
pub mod reader;
pub mod record;
pub mod source;

pub use decompress::{DecompressFn, DecompressorRegistry};
pub use facade::{Bag, ReadOptions, ReadResult};
pub use fields::{encode_fields, extract_fields, HeaderFields};
pub use messages::{read_chunk_messages, ChunkMessageIter};
pub use reader::{BagMetadata, BagReader, ChunkPayload, BAG_MAGIC};
pub use record::{
    frame_expected, frame_record, BagHeader, ChunkInfo, ChunkRecord, ConnCount, ConnectionRecord,
    IndexData, IndexEntry, MessageData, RawRecord, RecordSpan, OP_BAG_HEADER, OP_CHUNK,
    OP_CHUNK_INFO, OP_CONNECTION, OP_INDEX_DATA, OP_MESSAGE_DATA,
};
pub use source::{BlobSource, ByteSource, FileSource};
