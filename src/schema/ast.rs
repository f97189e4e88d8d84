// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! AST types for parsed ROS message definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive wire types of the ROS1 message serialization.
///
/// `json` is a pseudo-primitive: it travels as a `string` on the wire and
/// is only produced by the `#pragma rosbag_parse_json` directive (or an
/// explicit `json` type token).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    /// Boolean, one byte on the wire
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Length-prefixed UTF-8 string
    String,
    /// Timestamp: u32 seconds + u32 nanoseconds
    Time,
    /// Duration, wire-identical to Time
    Duration,
    /// JSON payload carried as a string
    Json,
}

impl Primitive {
    /// Parse a primitive type token, applying the `char`/`byte` aliases.
    pub fn try_from_str(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(Primitive::Bool),
            "int8" | "byte" => Some(Primitive::Int8),
            "int16" => Some(Primitive::Int16),
            "int32" => Some(Primitive::Int32),
            "int64" => Some(Primitive::Int64),
            "uint8" | "char" => Some(Primitive::UInt8),
            "uint16" => Some(Primitive::UInt16),
            "uint32" => Some(Primitive::UInt32),
            "uint64" => Some(Primitive::UInt64),
            "float32" => Some(Primitive::Float32),
            "float64" => Some(Primitive::Float64),
            "string" => Some(Primitive::String),
            "time" => Some(Primitive::Time),
            "duration" => Some(Primitive::Duration),
            "json" => Some(Primitive::Json),
            _ => None,
        }
    }

    /// Wire size in bytes, if fixed.
    pub const fn wire_size(self) -> Option<usize> {
        match self {
            Primitive::Bool | Primitive::Int8 | Primitive::UInt8 => Some(1),
            Primitive::Int16 | Primitive::UInt16 => Some(2),
            Primitive::Int32 | Primitive::UInt32 | Primitive::Float32 => Some(4),
            Primitive::Int64 | Primitive::UInt64 | Primitive::Float64 => Some(8),
            Primitive::Time | Primitive::Duration => Some(8),
            Primitive::String | Primitive::Json => None,
        }
    }

    /// Whether this primitive is a signed or unsigned integer.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::Int8
                | Primitive::Int16
                | Primitive::Int32
                | Primitive::Int64
                | Primitive::UInt8
                | Primitive::UInt16
                | Primitive::UInt32
                | Primitive::UInt64
        )
    }

    /// Whether this primitive is an unsigned integer.
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::UInt8 | Primitive::UInt16 | Primitive::UInt32 | Primitive::UInt64
        )
    }

    /// The canonical type name.
    pub const fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::Int8 => "int8",
            Primitive::Int16 => "int16",
            Primitive::Int32 => "int32",
            Primitive::Int64 => "int64",
            Primitive::UInt8 => "uint8",
            Primitive::UInt16 => "uint16",
            Primitive::UInt32 => "uint32",
            Primitive::UInt64 => "uint64",
            Primitive::Float32 => "float32",
            Primitive::Float64 => "float64",
            Primitive::String => "string",
            Primitive::Time => "time",
            Primitive::Duration => "duration",
            Primitive::Json => "json",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a constant declaration.
///
/// Constants never appear on the wire; they are carried for schema
/// introspection only. Integers are widened so that out-of-range declared
/// values survive with a warning instead of failing the parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    /// Boolean constant
    Bool(bool),
    /// Signed integer constant
    Int(i64),
    /// Unsigned integer constant
    UInt(u64),
    /// Floating-point constant
    Float(f64),
    /// String constant, verbatim text after `=`
    String(String),
}

/// One field of a message definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// What the field is
    pub kind: FieldKind,
}

/// The shape of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Scalar primitive
    Primitive(Primitive),
    /// Array of primitives; `len` is `Some` for fixed-length arrays
    PrimitiveArray {
        /// Element type
        elem: Primitive,
        /// Fixed length, or None for a u32-length-prefixed array
        len: Option<u32>,
    },
    /// Scalar reference to another definition (fully qualified after resolution)
    Complex {
        /// Referenced type name
        type_name: String,
    },
    /// Array of complex values
    ComplexArray {
        /// Referenced type name
        type_name: String,
        /// Fixed length, or None for a u32-length-prefixed array
        len: Option<u32>,
    },
    /// Constant declaration; never serialized
    Constant {
        /// Declared primitive type
        prim: Primitive,
        /// Parsed value
        value: ConstantValue,
    },
}

impl Field {
    /// Whether this field is a constant declaration.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, FieldKind::Constant { .. })
    }

    /// Whether this field is an array.
    pub fn is_array(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::PrimitiveArray { .. } | FieldKind::ComplexArray { .. }
        )
    }

    /// Whether this field references another definition.
    pub fn is_complex(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Complex { .. } | FieldKind::ComplexArray { .. }
        )
    }
}

/// One parsed type definition.
///
/// A parsed schema is a `Vec<MessageDefinition>` whose head entry is the
/// unnamed root; every other entry carries the fully qualified name given
/// by its `MSG:` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDefinition {
    /// Fully qualified name; None for the root definition
    pub name: Option<String>,
    /// Ordered fields, constants included
    pub fields: Vec<Field>,
}

impl MessageDefinition {
    /// Fields that occupy wire bytes (constants excluded).
    pub fn wire_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_constant())
    }
}
