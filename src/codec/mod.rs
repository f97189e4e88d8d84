// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema-driven message codec.
//!
//! A [`MessageCodec`] compiles a resolved definition list into a plan
//! table once, then decodes, encodes, and sizes message bodies by
//! executing the plans. [`MessageReader`] and [`MessageWriter`] are thin
//! single-direction wrappers over the same machinery.

pub mod calculator;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod plan;

pub use decoder::JSON_ERROR_MARKER;
pub use plan::{CodecOp, CodecPlan, PlanTable};

use crate::core::{FieldMap, Result};
use crate::schema::MessageDefinition;

/// Compiled two-way codec for one message schema.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    table: PlanTable,
}

impl MessageCodec {
    /// Compile a codec from a resolved definition list.
    ///
    /// Fails with `MalformedSchema` unless exactly one unnamed root
    /// definition is present.
    pub fn new(definitions: &[MessageDefinition]) -> Result<Self> {
        Ok(MessageCodec {
            table: PlanTable::build(definitions)?,
        })
    }

    /// Decode a serialized message body into a field map.
    pub fn decode(&self, data: &[u8]) -> Result<FieldMap> {
        decoder::decode(&self.table, data)
    }

    /// Encode a field map into a fresh byte vector.
    pub fn encode(&self, message: &FieldMap) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encoder::encode_into(&self.table, message, &mut out)?;
        Ok(out)
    }

    /// Encode a field map, appending to `out`.
    ///
    /// On failure `out` keeps its original contents.
    pub fn encode_into(&self, message: &FieldMap, out: &mut Vec<u8>) -> Result<()> {
        encoder::encode_into(&self.table, message, out)
    }

    /// Exact encoded size of a message in bytes.
    pub fn byte_size(&self, message: &FieldMap) -> Result<u64> {
        calculator::byte_size(&self.table, message)
    }

    /// The compiled plan table (for inspection).
    pub fn plan_table(&self) -> &PlanTable {
        &self.table
    }
}

/// Read-only view of a compiled codec.
#[derive(Debug, Clone)]
pub struct MessageReader {
    codec: MessageCodec,
}

impl MessageReader {
    /// Compile a reader from a resolved definition list.
    pub fn new(definitions: &[MessageDefinition]) -> Result<Self> {
        Ok(MessageReader {
            codec: MessageCodec::new(definitions)?,
        })
    }

    /// Decode a serialized message body.
    pub fn read(&self, data: &[u8]) -> Result<FieldMap> {
        self.codec.decode(data)
    }
}

/// Write-only view of a compiled codec.
#[derive(Debug, Clone)]
pub struct MessageWriter {
    codec: MessageCodec,
}

impl MessageWriter {
    /// Compile a writer from a resolved definition list.
    pub fn new(definitions: &[MessageDefinition]) -> Result<Self> {
        Ok(MessageWriter {
            codec: MessageCodec::new(definitions)?,
        })
    }

    /// Encode a message into a fresh byte vector.
    pub fn write_message(&self, message: &FieldMap) -> Result<Vec<u8>> {
        self.codec.encode(message)
    }

    /// Encode a message, appending to `out`.
    pub fn write_message_into(&self, message: &FieldMap, out: &mut Vec<u8>) -> Result<()> {
        self.codec.encode_into(message, out)
    }

    /// Exact encoded size of a message in bytes.
    pub fn calculate_byte_size(&self, message: &FieldMap) -> Result<u64> {
        self.codec.byte_size(message)
    }
}
