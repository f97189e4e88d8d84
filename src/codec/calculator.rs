// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Plan executor for the size path: value tree -> exact wire size.
//!
//! Mirrors the encoder traversal so that `byte_size(v)` always equals
//! `encode(v).len()` for a shape-conformant value.

use crate::core::{BagError, FieldMap, Result, Value};
use crate::schema::Primitive;

use super::plan::{CodecOp, PlanTable};

/// Compute the exact encoded size of a message in bytes.
pub fn byte_size(table: &PlanTable, message: &FieldMap) -> Result<u64> {
    plan_size(table, table.root(), message)
}

fn plan_size(table: &PlanTable, plan_idx: usize, message: &FieldMap) -> Result<u64> {
    let mut total = 0u64;
    for op in &table.plan(plan_idx).ops {
        match op {
            CodecOp::Scalar { field, prim } => {
                total += scalar_size(field, *prim, get_field(message, field)?)?;
            }
            CodecOp::ByteArray { field, len } => {
                let count = match get_field(message, field)? {
                    Value::Bytes(b) => b.len(),
                    Value::Array(values) => values.len(),
                    other => {
                        return Err(BagError::codec_mismatch(
                            field,
                            "uint8 array",
                            other.type_name(),
                        ))
                    }
                };
                total += prefix_size(*len) + count as u64;
            }
            CodecOp::Array { field, elem, len } => {
                let values = expect_array(field, get_field(message, field)?)?;
                total += prefix_size(*len);
                for value in values {
                    total += scalar_size(field, *elem, value)?;
                }
            }
            CodecOp::Complex { field, plan } => {
                let nested = expect_struct(field, get_field(message, field)?)?;
                total += plan_size(table, *plan, nested)?;
            }
            CodecOp::ComplexArray { field, plan, len } => {
                let values = expect_array(field, get_field(message, field)?)?;
                total += prefix_size(*len);
                for value in values {
                    let nested = expect_struct(field, value)?;
                    total += plan_size(table, *plan, nested)?;
                }
            }
        }
    }
    Ok(total)
}

fn prefix_size(fixed: Option<u32>) -> u64 {
    if fixed.is_some() {
        0
    } else {
        4
    }
}

fn get_field<'a>(message: &'a FieldMap, field: &str) -> Result<&'a Value> {
    message
        .get(field)
        .ok_or_else(|| BagError::codec_mismatch(field, "value", "missing field"))
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

fn scalar_size(field: &str, prim: Primitive, value: &Value) -> Result<u64> {
    if let Some(fixed) = prim.wire_size() {
        return Ok(fixed as u64);
    }
    // Variable-size primitives: string and json.
    match (prim, value) {
        (Primitive::String, Value::String(s)) => Ok(4 + s.len() as u64),
        // Sized against the JSON-serialized form, matching the encoder.
        (Primitive::Json, Value::Json(v)) => Ok(4 + v.to_string().len() as u64),
        (Primitive::Json, Value::String(s)) => Ok(4 + s.len() as u64),
        _ => Err(BagError::codec_mismatch(
            field,
            prim.name(),
            value.type_name(),
        )),
    }
}
