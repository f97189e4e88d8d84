// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Codec plan generation.
//!
//! A plan is a flattened sequence of operations compiled once per schema
//! and shared by the decoder, the encoder, and the size calculator.
//! Complex fields dispatch to other plans by table index, so executing a
//! message never touches the schema tree again.

use std::collections::HashMap;
use std::fmt;

use crate::core::{BagError, Result};
use crate::schema::{FieldKind, MessageDefinition, Primitive};

/// One codec operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecOp {
    /// A scalar primitive (including string, time, duration, json).
    Scalar {
        /// Field name
        field: String,
        /// Primitive type
        prim: Primitive,
    },

    /// A `uint8` array: the byte fast path, no per-element dispatch.
    ByteArray {
        /// Field name
        field: String,
        /// Fixed length, or None for a u32-length-prefixed array
        len: Option<u32>,
    },

    /// An array of primitives.
    Array {
        /// Field name
        field: String,
        /// Element type
        elem: Primitive,
        /// Fixed length, or None for a u32-length-prefixed array
        len: Option<u32>,
    },

    /// An inlined nested message.
    Complex {
        /// Field name
        field: String,
        /// Index of the nested type's plan in the table
        plan: usize,
    },

    /// An array of nested messages.
    ComplexArray {
        /// Field name
        field: String,
        /// Index of the nested type's plan in the table
        plan: usize,
        /// Fixed length, or None for a u32-length-prefixed array
        len: Option<u32>,
    },
}

/// The compiled plan for one type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecPlan {
    /// Fully qualified type name; None for the root
    pub type_name: Option<String>,
    /// Ordered operations, constants already stripped
    pub ops: Vec<CodecOp>,
}

/// Plan table for a resolved schema: one plan per definition.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTable {
    plans: Vec<CodecPlan>,
    root: usize,
}

impl PlanTable {
    /// Compile a resolved definition list into a plan table.
    ///
    /// Requires exactly one unnamed (root) definition and unique names for
    /// the rest; complex references must resolve within the list.
    pub fn build(definitions: &[MessageDefinition]) -> Result<PlanTable> {
        let mut root = None;
        let mut index_by_name: HashMap<&str, usize> = HashMap::new();
        for (idx, def) in definitions.iter().enumerate() {
            match def.name.as_deref() {
                None => {
                    if root.replace(idx).is_some() {
                        return Err(BagError::malformed_schema(
                            "more than one unnamed (root) definition",
                        ));
                    }
                }
                Some(name) => {
                    if index_by_name.insert(name, idx).is_some() {
                        return Err(BagError::malformed_schema(format!(
                            "duplicate definition of '{name}'"
                        )));
                    }
                }
            }
        }
        let root = root.ok_or_else(|| {
            BagError::malformed_schema("no unnamed (root) definition present")
        })?;

        let mut plans = Vec::with_capacity(definitions.len());
        for def in definitions {
            let mut ops = Vec::with_capacity(def.fields.len());
            for field in def.wire_fields() {
                ops.push(compile_field(field.name.clone(), &field.kind, &index_by_name)?);
            }
            plans.push(CodecPlan {
                type_name: def.name.clone(),
                ops,
            });
        }

        Ok(PlanTable { plans, root })
    }

    /// Index of the root plan.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Look up a plan by table index.
    pub fn plan(&self, idx: usize) -> &CodecPlan {
        &self.plans[idx]
    }

    /// Number of plans in the table.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

fn compile_field(
    field: String,
    kind: &FieldKind,
    index_by_name: &HashMap<&str, usize>,
) -> Result<CodecOp> {
    let lookup = |type_name: &str| -> Result<usize> {
        index_by_name
            .get(type_name)
            .copied()
            .ok_or_else(|| BagError::MissingType {
                type_name: type_name.to_string(),
            })
    };

    Ok(match kind {
        FieldKind::Primitive(prim) => CodecOp::Scalar { field, prim: *prim },
        FieldKind::PrimitiveArray {
            elem: Primitive::UInt8,
            len,
        } => CodecOp::ByteArray { field, len: *len },
        FieldKind::PrimitiveArray { elem, len } => CodecOp::Array {
            field,
            elem: *elem,
            len: *len,
        },
        FieldKind::Complex { type_name } => CodecOp::Complex {
            field,
            plan: lookup(type_name)?,
        },
        FieldKind::ComplexArray { type_name, len } => CodecOp::ComplexArray {
            field,
            plan: lookup(type_name)?,
            len: *len,
        },
        FieldKind::Constant { .. } => {
            unreachable!("wire_fields filters constants")
        }
    })
}

impl fmt::Display for PlanTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, plan) in self.plans.iter().enumerate() {
            let name = plan.type_name.as_deref().unwrap_or("<root>");
            writeln!(f, "plan {idx}: {name}")?;
            for (op_idx, op) in plan.ops.iter().enumerate() {
                writeln!(f, "  {op_idx:3}: {op:?}")?;
            }
        }
        Ok(())
    }
}
