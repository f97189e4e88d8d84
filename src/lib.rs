// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagcodec
//!
//! Library for reading ROS1 bag v2.0 files.
//!
//! A bag concatenates timestamped messages from many topics; each topic
//! ships the textual schema its messages are serialized against. This
//! crate provides the three pieces needed to get structured data out:
//! - **[`Bag`]** - container facade: open a source, iterate messages by
//!   topic and time window
//! - **[`parse_message_definition`]** - schema parser for the textual
//!   message-definition grammar
//! - **[`MessageCodec`]** - schema-compiled decoder/encoder/sizer for
//!   message bodies
//!
//! ## Example: Reading a bag
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagcodec::{Bag, ReadOptions};
//!
//! let mut bag = Bag::open_file("drive.bag")?;
//! println!("topics: {:?}", bag.topics());
//!
//! bag.read_messages(&ReadOptions::default(), |result| {
//!     println!("[{}] {}", result.timestamp, result.topic);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Round-tripping a message body
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagcodec::{parse_message_definition, MessageCodec, Value};
//!
//! let defs = parse_message_definition("uint16 age")?;
//! let codec = MessageCodec::new(&defs)?;
//!
//! let message = [("age".to_string(), Value::UInt16(5))].into_iter().collect();
//! let bytes = codec.encode(&message)?;
//! assert_eq!(bytes, [0x05, 0x00]);
//! assert_eq!(codec.decode(&bytes)?, message);
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use crate::core::{BagError, FieldMap, Result, Time, Value};

// Message-definition schema model and parser
pub mod schema;

pub use schema::{
    parse_message_definition, ConstantValue, Field, FieldKind, MessageDefinition, Primitive,
};

// Schema-driven message codec
pub mod codec;

pub use codec::{MessageCodec, MessageReader, MessageWriter};

// Container support
pub mod bag;

pub use bag::{
    Bag, BlobSource, ByteSource, ChunkInfo, ConnectionRecord, DecompressorRegistry, FileSource,
    ReadOptions, ReadResult,
};
