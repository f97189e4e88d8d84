// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Plan executor for the read path: message bytes -> value tree.

use crate::core::{BagError, FieldMap, Result, Time, Value};
use crate::schema::Primitive;

use super::cursor::ReadCursor;
use super::plan::{CodecOp, PlanTable};

/// Maximum allowed array length, to bound corrupt length prefixes.
const MAX_ARRAY_LENGTH: usize = 10_000_000;

/// Marker prefixed to the raw text when a `json` field fails to parse.
pub const JSON_ERROR_MARKER: &str = "could not parse JSON: ";

/// Decode a message body against a compiled plan table.
///
/// Constants never surface as output keys, and the body must be fully
/// consumed; trailing bytes are a shape mismatch.
pub fn decode(table: &PlanTable, data: &[u8]) -> Result<FieldMap> {
    let mut cursor = ReadCursor::new(data);
    let message = exec_plan(table, table.root(), &mut cursor)?;
    if !cursor.is_at_end() {
        return Err(BagError::codec_mismatch(
            "<root>",
            "end of message",
            format!("{} trailing bytes", cursor.remaining()),
        ));
    }
    Ok(message)
}

fn exec_plan(table: &PlanTable, plan_idx: usize, cursor: &mut ReadCursor<'_>) -> Result<FieldMap> {
    let mut out = FieldMap::new();
    for op in &table.plan(plan_idx).ops {
        match op {
            CodecOp::Scalar { field, prim } => {
                out.insert(field.clone(), read_scalar(cursor, *prim)?);
            }
            CodecOp::ByteArray { field, len } => {
                // No element-count guard needed: take() bounds the read.
                let count = match len {
                    Some(n) => *n as usize,
                    None => cursor.read_u32()? as usize,
                };
                let bytes = cursor.take(count)?;
                out.insert(field.clone(), Value::Bytes(bytes.to_vec()));
            }
            CodecOp::Array { field, elem, len } => {
                let count = array_len(cursor, *len)?;
                let mut values = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    values.push(read_scalar(cursor, *elem)?);
                }
                out.insert(field.clone(), Value::Array(values));
            }
            CodecOp::Complex { field, plan } => {
                out.insert(field.clone(), Value::Struct(exec_plan(table, *plan, cursor)?));
            }
            CodecOp::ComplexArray { field, plan, len } => {
                let count = array_len(cursor, *len)?;
                let mut values = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    values.push(Value::Struct(exec_plan(table, *plan, cursor)?));
                }
                out.insert(field.clone(), Value::Array(values));
            }
        }
    }
    Ok(out)
}

fn array_len(cursor: &mut ReadCursor<'_>, fixed: Option<u32>) -> Result<usize> {
    let count = match fixed {
        Some(n) => n as usize,
        None => cursor.read_u32()? as usize,
    };
    if count > MAX_ARRAY_LENGTH {
        return Err(BagError::codec_mismatch(
            "<array>",
            format!("length <= {MAX_ARRAY_LENGTH}"),
            count.to_string(),
        ));
    }
    Ok(count)
}

fn read_scalar(cursor: &mut ReadCursor<'_>, prim: Primitive) -> Result<Value> {
    Ok(match prim {
        Primitive::Bool => Value::Bool(cursor.read_u8()? != 0),
        Primitive::Int8 => Value::Int8(cursor.read_i8()?),
        Primitive::Int16 => Value::Int16(cursor.read_i16()?),
        Primitive::Int32 => Value::Int32(cursor.read_i32()?),
        Primitive::Int64 => Value::Int64(cursor.read_i64()?),
        Primitive::UInt8 => Value::UInt8(cursor.read_u8()?),
        Primitive::UInt16 => Value::UInt16(cursor.read_u16()?),
        Primitive::UInt32 => Value::UInt32(cursor.read_u32()?),
        Primitive::UInt64 => Value::UInt64(cursor.read_u64()?),
        Primitive::Float32 => Value::Float32(cursor.read_f32()?),
        Primitive::Float64 => Value::Float64(cursor.read_f64()?),
        Primitive::String => Value::String(cursor.read_string()?),
        Primitive::Time => {
            let sec = cursor.read_u32()?;
            let nsec = cursor.read_u32()?;
            Value::Time(Time::new(sec, nsec))
        }
        Primitive::Duration => {
            let sec = cursor.read_u32()?;
            let nsec = cursor.read_u32()?;
            Value::Duration(Time::new(sec, nsec))
        }
        Primitive::Json => {
            let raw = cursor.read_string()?;
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(parsed) => Value::Json(parsed),
                Err(_) => Value::String(format!("{JSON_ERROR_MARKER}{raw}")),
            }
        }
    })
}
