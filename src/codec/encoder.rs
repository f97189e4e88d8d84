// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Plan executor for the write path: value tree -> message bytes.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::core::{BagError, FieldMap, Result, Time, Value};
use crate::schema::Primitive;

use super::plan::{CodecOp, PlanTable};

/// Encode a message against a compiled plan table, appending to `out`.
///
/// On any shape mismatch `out` is restored to its original length, so a
/// failed encode leaves no partial output.
pub fn encode_into(table: &PlanTable, message: &FieldMap, out: &mut Vec<u8>) -> Result<()> {
    let start = out.len();
    match exec_plan(table, table.root(), message, out) {
        Ok(()) => Ok(()),
        Err(err) => {
            out.truncate(start);
            Err(err)
        }
    }
}

fn exec_plan(
    table: &PlanTable,
    plan_idx: usize,
    message: &FieldMap,
    out: &mut Vec<u8>,
) -> Result<()> {
    for op in &table.plan(plan_idx).ops {
        match op {
            CodecOp::Scalar { field, prim } => {
                write_scalar(field, *prim, get_field(message, field, prim.name())?, out)?;
            }
            CodecOp::ByteArray { field, len } => {
                write_byte_array(field, *len, get_field(message, field, "uint8 array")?, out)?;
            }
            CodecOp::Array { field, elem, len } => {
                let values = expect_array(field, get_field(message, field, "array")?)?;
                check_fixed_len(field, *len, values.len(), out)?;
                for value in values {
                    write_scalar(field, *elem, value, out)?;
                }
            }
            CodecOp::Complex { field, plan } => {
                let nested = expect_struct(field, get_field(message, field, "struct")?)?;
                exec_plan(table, *plan, nested, out)?;
            }
            CodecOp::ComplexArray { field, plan, len } => {
                let values = expect_array(field, get_field(message, field, "struct array")?)?;
                check_fixed_len(field, *len, values.len(), out)?;
                for value in values {
                    let nested = expect_struct(field, value)?;
                    exec_plan(table, *plan, nested, out)?;
                }
            }
        }
    }
    Ok(())
}

fn get_field<'a>(message: &'a FieldMap, field: &str, expected: &str) -> Result<&'a Value> {
    message
        .get(field)
        .ok_or_else(|| BagError::codec_mismatch(field, expected, "missing field"))
}

fn expect_array<'a>(field: &str, value: &'a Value) -> Result<&'a [Value]> {
    value
        .as_array()
        .ok_or_else(|| BagError::codec_mismatch(field, "array", value.type_name()))
}

fn expect_struct<'a>(field: &str, value: &'a Value) -> Result<&'a FieldMap> {
    value
        .as_struct()
        .ok_or_else(|| BagError::codec_mismatch(field, "struct", value.type_name()))
}

/// Write the length prefix of a variable array, or verify a fixed length.
fn check_fixed_len(field: &str, fixed: Option<u32>, actual: usize, out: &mut Vec<u8>) -> Result<()> {
    match fixed {
        Some(expected) => {
            if actual != expected as usize {
                return Err(BagError::codec_mismatch(
                    field,
                    format!("{expected} elements"),
                    format!("{actual} elements"),
                ));
            }
        }
        None => out.write_u32::<LittleEndian>(actual as u32)?,
    }
    Ok(())
}

/// The writer accepts either the `Bytes` fast path or a general `uint8`
/// array and encodes them identically.
fn write_byte_array(field: &str, fixed: Option<u32>, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let bytes: Vec<u8> = match value {
        Value::Bytes(b) => b.clone(),
        Value::Array(values) => {
            let mut bytes = Vec::with_capacity(values.len());
            for v in values {
                match v {
                    Value::UInt8(b) => bytes.push(*b),
                    other => {
                        return Err(BagError::codec_mismatch(
                            field,
                            "uint8",
                            other.type_name(),
                        ))
                    }
                }
            }
            bytes
        }
        other => {
            return Err(BagError::codec_mismatch(
                field,
                "uint8 array",
                other.type_name(),
            ))
        }
    };
    check_fixed_len(field, fixed, bytes.len(), out)?;
    out.extend_from_slice(&bytes);
    Ok(())
}

fn write_scalar(field: &str, prim: Primitive, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let mismatch = || BagError::codec_mismatch(field, prim.name(), value.type_name());
    match (prim, value) {
        (Primitive::Bool, Value::Bool(v)) => out.write_u8(*v as u8)?,
        (Primitive::Int8, Value::Int8(v)) => out.write_i8(*v)?,
        (Primitive::Int16, Value::Int16(v)) => out.write_i16::<LittleEndian>(*v)?,
        (Primitive::Int32, Value::Int32(v)) => out.write_i32::<LittleEndian>(*v)?,
        (Primitive::Int64, Value::Int64(v)) => out.write_i64::<LittleEndian>(*v)?,
        (Primitive::UInt8, Value::UInt8(v)) => out.write_u8(*v)?,
        (Primitive::UInt16, Value::UInt16(v)) => out.write_u16::<LittleEndian>(*v)?,
        (Primitive::UInt32, Value::UInt32(v)) => out.write_u32::<LittleEndian>(*v)?,
        (Primitive::UInt64, Value::UInt64(v)) => out.write_u64::<LittleEndian>(*v)?,
        (Primitive::Float32, Value::Float32(v)) => out.write_f32::<LittleEndian>(*v)?,
        (Primitive::Float64, Value::Float64(v)) => out.write_f64::<LittleEndian>(*v)?,
        (Primitive::String, Value::String(v)) => write_string(v, out)?,
        (Primitive::Time, Value::Time(t)) => write_time(*t, out)?,
        (Primitive::Duration, Value::Duration(t)) => write_time(*t, out)?,
        // A json field serializes Json values; strings (e.g. a decode
        // diagnostic carried back through) are written as-is.
        (Primitive::Json, Value::Json(v)) => write_string(&v.to_string(), out)?,
        (Primitive::Json, Value::String(v)) => write_string(v, out)?,
        _ => return Err(mismatch()),
    }
    Ok(())
}

fn write_string(s: &str, out: &mut Vec<u8>) -> Result<()> {
    out.write_u32::<LittleEndian>(s.len() as u32)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn write_time(t: Time, out: &mut Vec<u8>) -> Result<()> {
    out.write_u32::<LittleEndian>(t.sec)?;
    out.write_u32::<LittleEndian>(t.nsec)?;
    Ok(())
}
