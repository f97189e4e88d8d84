// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for bagcodec.
//!
//! Covers the failure surface of the container reader, the
//! message-definition parser, and the message codec:
//! - Byte-source and preamble failures
//! - Record framing corruption
//! - Schema parse and resolution failures
//! - Codec shape mismatches

use std::fmt;

/// Errors that can occur while reading a bag or running a message codec.
#[derive(Debug, Clone)]
pub enum BagError {
    /// Underlying byte-range source failure
    Io {
        /// Error message from the source
        message: String,
    },

    /// The file preamble is not the bag v2.0 magic
    NotABag {
        /// What was found at offset 0
        found: String,
    },

    /// The source is smaller than the 13-byte preamble
    TruncatedPreamble {
        /// Source size in bytes
        size: u64,
    },

    /// A record extends past the end of its buffer
    TruncatedRecord {
        /// What was being framed
        context: String,
        /// Bytes needed to continue
        needed: usize,
        /// Bytes available
        available: usize,
    },

    /// A header-field block ends inside a field length prefix
    TruncatedHeader {
        /// Bytes available where 4 were required
        available: usize,
    },

    /// A declared header-field length overruns the block
    CorruptHeader {
        /// Declared field length
        declared: usize,
        /// Bytes remaining in the block
        available: usize,
    },

    /// A header field contains no `=` separator
    MissingEquals,

    /// A required header field is absent or mis-sized
    MissingRequiredField {
        /// Field key
        key: String,
    },

    /// Typed framing found a different opcode than requested
    UnexpectedRecordKind {
        /// Opcode the caller expected
        expected: u8,
        /// Opcode found in the record header
        actual: u8,
    },

    /// A chunk requires a compression algorithm with no registered decompressor
    UnsupportedCompression {
        /// Algorithm name from the chunk header
        name: String,
    },

    /// A registered decompressor failed
    Decompression {
        /// Algorithm name
        name: String,
        /// Error message
        message: String,
    },

    /// Malformed message-definition text
    SchemaParse {
        /// The offending line, trimmed
        line: String,
        /// What went wrong
        message: String,
    },

    /// A complex field references a type with no matching definition
    MissingType {
        /// The referenced type name
        type_name: String,
    },

    /// A complex field reference matches more than one definition
    AmbiguousType {
        /// The referenced type name
        type_name: String,
    },

    /// The definition list is not usable as a codec schema
    MalformedSchema {
        /// Why the schema was rejected
        reason: String,
    },

    /// Message bytes or a value do not match the schema shape
    CodecMismatch {
        /// Field path being coded
        field: String,
        /// What the schema called for
        expected: String,
        /// What was found
        found: String,
    },

    /// Time arithmetic produced a negative or overflowing result
    InvalidTimeArithmetic {
        /// Normalized seconds
        sec: i64,
        /// Normalized nanoseconds
        nsec: i64,
    },

    /// A message record references a connection id the bag never declared
    UnknownConnection {
        /// Connection id from the message record
        conn: u32,
    },

    /// Other error
    Other(String),
}

impl BagError {
    /// Create a source I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        BagError::Io {
            message: message.into(),
        }
    }

    /// Create a truncated-record error.
    pub fn truncated_record(context: impl Into<String>, needed: usize, available: usize) -> Self {
        BagError::TruncatedRecord {
            context: context.into(),
            needed,
            available,
        }
    }

    /// Create a missing-required-field error.
    pub fn missing_field(key: impl Into<String>) -> Self {
        BagError::MissingRequiredField { key: key.into() }
    }

    /// Create an unsupported-compression error.
    pub fn unsupported_compression(name: impl Into<String>) -> Self {
        BagError::UnsupportedCompression { name: name.into() }
    }

    /// Create a decompression failure.
    pub fn decompression(name: impl Into<String>, message: impl Into<String>) -> Self {
        BagError::Decompression {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a schema parse error.
    pub fn schema_parse(line: impl Into<String>, message: impl Into<String>) -> Self {
        BagError::SchemaParse {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Create a malformed-schema error.
    pub fn malformed_schema(reason: impl Into<String>) -> Self {
        BagError::MalformedSchema {
            reason: reason.into(),
        }
    }

    /// Create a codec shape-mismatch error.
    pub fn codec_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        BagError::CodecMismatch {
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an invalid-time-arithmetic error.
    pub fn invalid_time(sec: i64, nsec: i64) -> Self {
        BagError::InvalidTimeArithmetic { sec, nsec }
    }
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BagError::Io { message } => write!(f, "source I/O error: {message}"),
            BagError::NotABag { found } => {
                write!(f, "not a ROS bag v2.0 file (preamble: {found:?})")
            }
            BagError::TruncatedPreamble { size } => {
                write!(f, "file too small for bag preamble ({size} bytes)")
            }
            BagError::TruncatedRecord {
                context,
                needed,
                available,
            } => write!(
                f,
                "truncated record while framing {context}: needed {needed} bytes, {available} available"
            ),
            BagError::TruncatedHeader { available } => write!(
                f,
                "truncated header-field block: {available} bytes where a 4-byte length was required"
            ),
            BagError::CorruptHeader {
                declared,
                available,
            } => write!(
                f,
                "corrupt header-field block: declared field length {declared} overruns {available} remaining bytes"
            ),
            BagError::MissingEquals => write!(f, "header field contains no '=' separator"),
            BagError::MissingRequiredField { key } => {
                write!(f, "required header field '{key}' missing or mis-sized")
            }
            BagError::UnexpectedRecordKind { expected, actual } => write!(
                f,
                "unexpected record kind: expected op {expected:#04x}, found {actual:#04x}"
            ),
            BagError::UnsupportedCompression { name } => {
                write!(f, "unsupported compression: no decompressor registered for '{name}'")
            }
            BagError::Decompression { name, message } => {
                write!(f, "'{name}' decompression failed: {message}")
            }
            BagError::SchemaParse { line, message } => {
                write!(f, "schema parse error at '{line}': {message}")
            }
            BagError::MissingType { type_name } => {
                write!(f, "no definition found for type '{type_name}'")
            }
            BagError::AmbiguousType { type_name } => {
                write!(f, "type reference '{type_name}' matches more than one definition")
            }
            BagError::MalformedSchema { reason } => write!(f, "malformed schema: {reason}"),
            BagError::CodecMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "codec mismatch at field '{field}': expected {expected}, found {found}"
            ),
            BagError::InvalidTimeArithmetic { sec, nsec } => write!(
                f,
                "time arithmetic out of range (sec: {sec}, nsec: {nsec})"
            ),
            BagError::UnknownConnection { conn } => {
                write!(f, "message references undeclared connection id {conn}")
            }
            BagError::Other(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for BagError {}

impl From<std::io::Error> for BagError {
    fn from(err: std::io::Error) -> Self {
        BagError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for bagcodec operations.
pub type Result<T> = std::result::Result<T, BagError>;
