// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Parser for the textual ROS message-definition grammar.
//!
//! The format, as shipped inside bag Connection records:
//! - Definitions separated by lines of `=` characters
//! - `MSG: package/TypeName` names the definition that follows
//! - `#` starts a comment, except inside string-constant values
//! - `#pragma rosbag_parse_json` marks the next field declaration as the
//!   `json` pseudo-type
//! - `type[N] name` / `type[] name` declare fixed / dynamic arrays
//! - `type NAME=value` declares a constant
//!
//! After collection every complex field reference is resolved to exactly
//! one named definition and rewritten to its fully qualified name.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::core::{BagError, Result};

use super::ast::{ConstantValue, Field, FieldKind, MessageDefinition, Primitive};

/// The pragma that switches the next declaration to the json pseudo-type.
const JSON_PRAGMA: &str = "#pragma rosbag_parse_json";

/// Compiled line matchers, built once per parse call.
struct LineMatchers {
    /// `type NAME = value` (the `=` must follow the name token directly)
    constant: Regex,
    /// `type[...]? name`
    field: Regex,
}

impl LineMatchers {
    fn new() -> Self {
        LineMatchers {
            constant: Regex::new(
                r"^(?P<type>[A-Za-z][A-Za-z0-9_/]*)\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?P<value>.*)$",
            )
            .expect("constant line regex"),
            field: Regex::new(
                r"^(?P<type>[A-Za-z][A-Za-z0-9_/]*)(?P<array>\[[0-9]*\])?\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)$",
            )
            .expect("field line regex"),
        }
    }
}

/// Parse a multi-type message definition into a normalized definition list.
///
/// The result holds exactly the definitions that appear in the text, in
/// order: the unnamed root first, then its named dependencies. Complex
/// field types are rewritten to fully qualified names.
pub fn parse_message_definition(text: &str) -> Result<Vec<MessageDefinition>> {
    let matchers = LineMatchers::new();

    let mut definitions: Vec<MessageDefinition> = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_fields: Vec<Field> = Vec::new();
    let mut first_block = true;
    let mut json_pragma = false;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        // Separator: two or more '=' characters alone on the line.
        if line.len() >= 2 && line.bytes().all(|b| b == b'=') {
            push_block(
                &mut definitions,
                &mut current_name,
                &mut current_fields,
                &mut first_block,
            );
            json_pragma = false;
            continue;
        }

        if let Some(rest) = line.strip_prefix("MSG:") {
            let name = rest.split('#').next().unwrap_or("").trim();
            if name.is_empty() {
                return Err(BagError::schema_parse(line, "MSG: line without a type name"));
            }
            current_name = Some(name.to_string());
            continue;
        }

        if line.starts_with('#') {
            if line == JSON_PRAGMA {
                json_pragma = true;
            }
            continue;
        }

        let field = parse_declaration(&matchers, line, &mut json_pragma)?;
        current_fields.push(field);
    }
    push_block(
        &mut definitions,
        &mut current_name,
        &mut current_fields,
        &mut first_block,
    );

    resolve_complex_types(&mut definitions)?;
    detect_cycles(&definitions)?;

    Ok(definitions)
}

/// Close the current block and start a new one.
///
/// The first block is always emitted (it is the root, even when empty);
/// later blocks are emitted only when they carry a name or fields, so a
/// trailing separator does not produce a phantom definition.
fn push_block(
    definitions: &mut Vec<MessageDefinition>,
    name: &mut Option<String>,
    fields: &mut Vec<Field>,
    first_block: &mut bool,
) {
    if *first_block || name.is_some() || !fields.is_empty() {
        definitions.push(MessageDefinition {
            name: name.take(),
            fields: std::mem::take(fields),
        });
        *first_block = false;
    }
}

/// Parse one non-comment, non-directive line into a field or constant.
fn parse_declaration(
    matchers: &LineMatchers,
    line: &str,
    json_pragma: &mut bool,
) -> Result<Field> {
    // Constants are matched on the raw line: string-constant values keep
    // their '#' characters.
    if let Some(caps) = matchers.constant.captures(line) {
        *json_pragma = false;
        return parse_constant(line, &caps["type"], &caps["name"], &caps["value"]);
    }

    let code = line.split('#').next().unwrap_or("").trim();
    let caps = matchers
        .field
        .captures(code)
        .ok_or_else(|| BagError::schema_parse(line, "not a field or constant declaration"))?;

    let type_token = &caps["type"];
    let name = caps["name"].to_string();
    let len = match caps.name("array") {
        None => None,
        Some(m) => {
            let digits = &m.as_str()[1..m.as_str().len() - 1];
            if digits.is_empty() {
                Some(None)
            } else {
                Some(Some(digits.parse::<u32>().map_err(|_| {
                    BagError::schema_parse(line, "invalid fixed array length")
                })?))
            }
        }
    };

    let prim = if std::mem::take(json_pragma) {
        Some(Primitive::Json)
    } else {
        Primitive::try_from_str(type_token)
    };

    let kind = match (prim, len) {
        (Some(p), None) => FieldKind::Primitive(p),
        (Some(p), Some(len)) => FieldKind::PrimitiveArray { elem: p, len },
        (None, None) => FieldKind::Complex {
            type_name: type_token.to_string(),
        },
        (None, Some(len)) => FieldKind::ComplexArray {
            type_name: type_token.to_string(),
            len,
        },
    };

    Ok(Field { name, kind })
}

/// Parse a constant declaration.
fn parse_constant(line: &str, type_token: &str, name: &str, value_text: &str) -> Result<Field> {
    let prim = Primitive::try_from_str(type_token)
        .ok_or_else(|| BagError::schema_parse(line, "constants must have a primitive type"))?;

    let value = match prim {
        Primitive::String => {
            // Verbatim: '#' has no comment meaning inside string constants.
            ConstantValue::String(value_text.trim().to_string())
        }
        Primitive::Bool => {
            let text = strip_value_comment(value_text);
            ConstantValue::Bool(parse_bool_constant(line, &text)?)
        }
        p if p.is_integer() => {
            let text = strip_value_comment(value_text);
            parse_integer_constant(line, p, &text)?
        }
        Primitive::Float32 | Primitive::Float64 => {
            let text = strip_value_comment(value_text);
            ConstantValue::Float(parse_number(&text).ok_or_else(|| {
                BagError::schema_parse(line, "invalid float constant value")
            })?)
        }
        other => {
            return Err(BagError::schema_parse(
                line,
                format!("'{other}' cannot be a constant type"),
            ));
        }
    };

    Ok(Field {
        name: name.to_string(),
        kind: FieldKind::Constant { prim, value },
    })
}

/// Drop a trailing `#...` comment from a non-string constant value.
fn strip_value_comment(value_text: &str) -> String {
    value_text
        .split('#')
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Coerce Python-style booleans, then parse as f64.
fn parse_number(text: &str) -> Option<f64> {
    match text.replace("True", "true").replace("False", "false").as_str() {
        "true" => Some(1.0),
        "false" => Some(0.0),
        other => other.trim().parse::<f64>().ok(),
    }
}

fn parse_bool_constant(line: &str, text: &str) -> Result<bool> {
    let n = parse_number(text)
        .ok_or_else(|| BagError::schema_parse(line, "invalid bool constant value"))?;
    Ok(n != 0.0)
}

fn parse_integer_constant(line: &str, prim: Primitive, text: &str) -> Result<ConstantValue> {
    let coerced = text.replace("True", "true").replace("False", "false");
    let parsed: i128 = match coerced.trim() {
        "true" => 1,
        "false" => 0,
        other => other.parse::<i128>().map_err(|_| {
            BagError::schema_parse(line, "invalid integer constant value")
        })?,
    };

    let (lo, hi): (i128, i128) = match prim {
        Primitive::Int8 => (i8::MIN as i128, i8::MAX as i128),
        Primitive::Int16 => (i16::MIN as i128, i16::MAX as i128),
        Primitive::Int32 => (i32::MIN as i128, i32::MAX as i128),
        Primitive::Int64 => (i64::MIN as i128, i64::MAX as i128),
        Primitive::UInt8 => (0, u8::MAX as i128),
        Primitive::UInt16 => (0, u16::MAX as i128),
        Primitive::UInt32 => (0, u32::MAX as i128),
        Primitive::UInt64 => (0, u64::MAX as i128),
        _ => unreachable!("caller checked is_integer"),
    };
    if parsed < lo || parsed > hi {
        tracing::warn!(
            value = %parsed,
            declared = %prim,
            "integer constant outside the range of its declared type"
        );
    }

    if prim.is_unsigned() && parsed >= 0 {
        Ok(ConstantValue::UInt(parsed.min(u64::MAX as i128) as u64))
    } else {
        Ok(ConstantValue::Int(
            parsed.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
        ))
    }
}

/// Resolve every complex field reference to exactly one named definition
/// and rewrite it to the fully qualified name.
fn resolve_complex_types(definitions: &mut [MessageDefinition]) -> Result<()> {
    let named: Vec<String> = definitions
        .iter()
        .filter_map(|d| d.name.clone())
        .collect();

    for def in definitions.iter_mut() {
        for field in &mut def.fields {
            let type_name = match &mut field.kind {
                FieldKind::Complex { type_name } => type_name,
                FieldKind::ComplexArray { type_name, .. } => type_name,
                _ => continue,
            };
            *type_name = resolve_name(&named, type_name)?;
        }
    }
    Ok(())
}

fn resolve_name(named: &[String], given: &str) -> Result<String> {
    let suffix = format!("/{given}");
    let matches: Vec<&String> = if given.contains('/') {
        named.iter().filter(|n| n.as_str() == given).collect()
    } else {
        named
            .iter()
            .filter(|n| n.as_str() == given || n.ends_with(&suffix))
            .collect()
    };

    match matches.len() {
        0 => Err(BagError::MissingType {
            type_name: given.to_string(),
        }),
        1 => Ok(matches[0].clone()),
        _ => Err(BagError::AmbiguousType {
            type_name: given.to_string(),
        }),
    }
}

/// Reject cyclic complex references; the wire format has no pointer
/// semantics, so a valid schema is a DAG.
fn detect_cycles(definitions: &[MessageDefinition]) -> Result<()> {
    let by_name: HashMap<&str, &MessageDefinition> = definitions
        .iter()
        .filter_map(|d| d.name.as_deref().map(|n| (n, d)))
        .collect();

    fn visit<'a>(
        def: &'a MessageDefinition,
        by_name: &HashMap<&'a str, &'a MessageDefinition>,
        in_progress: &mut HashSet<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<()> {
        for field in &def.fields {
            let type_name = match &field.kind {
                FieldKind::Complex { type_name } => type_name.as_str(),
                FieldKind::ComplexArray { type_name, .. } => type_name.as_str(),
                _ => continue,
            };
            if done.contains(type_name) {
                continue;
            }
            if !in_progress.insert(type_name) {
                return Err(BagError::malformed_schema(format!(
                    "cyclic type reference involving '{type_name}'"
                )));
            }
            if let Some(child) = by_name.get(type_name) {
                visit(child, by_name, in_progress, done)?;
            }
            in_progress.remove(type_name);
            done.insert(type_name);
        }
        Ok(())
    }

    let mut done = HashSet::new();
    for def in definitions {
        let mut in_progress = HashSet::new();
        visit(def, &by_name, &mut in_progress, &mut done)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_primitive_field() {
        let defs = parse_message_definition("uint16 age").unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, None);
        assert_eq!(defs[0].fields.len(), 1);
        assert_eq!(defs[0].fields[0].name, "age");
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Primitive(Primitive::UInt16)
        );
    }

    #[test]
    fn test_aliases_applied() {
        let defs = parse_message_definition("char a\nbyte b").unwrap();
        assert_eq!(defs[0].fields[0].kind, FieldKind::Primitive(Primitive::UInt8));
        assert_eq!(defs[0].fields[1].kind, FieldKind::Primitive(Primitive::Int8));
    }

    #[test]
    fn test_arrays() {
        let defs = parse_message_definition("float32[3] position\nint32[] values").unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::PrimitiveArray {
                elem: Primitive::Float32,
                len: Some(3)
            }
        );
        assert_eq!(
            defs[0].fields[1].kind,
            FieldKind::PrimitiveArray {
                elem: Primitive::Int32,
                len: None
            }
        );
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let with_noise = "# leading comment\n\n  uint8 a   # trailing comment\n\n# another\nbool b\n";
        let clean = "uint8 a\nbool b";
        assert_eq!(
            parse_message_definition(with_noise).unwrap(),
            parse_message_definition(clean).unwrap()
        );
    }

    #[test]
    fn test_integer_constant() {
        let defs = parse_message_definition("byte STALE=3\nbool level").unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Constant {
                prim: Primitive::Int8,
                value: ConstantValue::Int(3)
            }
        );
        assert!(defs[0].fields[0].is_constant());
        assert!(!defs[0].fields[1].is_constant());
    }

    #[test]
    fn test_constant_with_trailing_comment() {
        let defs = parse_message_definition("int32 FOO = 42 # the answer").unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Constant {
                prim: Primitive::Int32,
                value: ConstantValue::Int(42)
            }
        );
    }

    #[test]
    fn test_string_constant_keeps_hash() {
        let defs = parse_message_definition("string EXAMPLE=#comment is value").unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Constant {
                prim: Primitive::String,
                value: ConstantValue::String("#comment is value".to_string())
            }
        );
    }

    #[test]
    fn test_bool_constant_python_style() {
        let defs = parse_message_definition("bool ENABLED=True").unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Constant {
                prim: Primitive::Bool,
                value: ConstantValue::Bool(true)
            }
        );
    }

    #[test]
    fn test_unsigned_constant() {
        let defs = parse_message_definition("uint32 MASK=4294967295").unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Constant {
                prim: Primitive::UInt32,
                value: ConstantValue::UInt(4_294_967_295)
            }
        );
    }

    #[test]
    fn test_comment_with_equals_is_not_constant() {
        let defs = parse_message_definition("int32 x # default=5").unwrap();
        assert_eq!(defs[0].fields[0].kind, FieldKind::Primitive(Primitive::Int32));
        assert_eq!(defs[0].fields[0].name, "x");
    }

    #[test]
    fn test_dependency_resolution() {
        let text = "\
Point center
===
MSG: geometry_msgs/Point
float64 x
float64 y
";
        let defs = parse_message_definition(text).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Complex {
                type_name: "geometry_msgs/Point".to_string()
            }
        );
        assert_eq!(defs[1].name.as_deref(), Some("geometry_msgs/Point"));
    }

    #[test]
    fn test_qualified_reference_resolves_exactly() {
        let text = "\
geometry_msgs/Point p
===
MSG: geometry_msgs/Point
float64 x
";
        let defs = parse_message_definition(text).unwrap();
        assert_eq!(
            defs[0].fields[0].kind,
            FieldKind::Complex {
                type_name: "geometry_msgs/Point".to_string()
            }
        );
    }

    #[test]
    fn test_missing_type_fails() {
        let err = parse_message_definition("Missing thing").unwrap_err();
        assert!(matches!(err, BagError::MissingType { .. }));
    }

    #[test]
    fn test_ambiguous_type_fails() {
        let text = "\
Point p
===
MSG: a_msgs/Point
float64 x
===
MSG: b_msgs/Point
float64 x
";
        let err = parse_message_definition(text).unwrap_err();
        assert!(matches!(err, BagError::AmbiguousType { .. }));
    }

    #[test]
    fn test_json_pragma_marks_next_field() {
        let text = "#pragma rosbag_parse_json\nstring data\nstring plain";
        let defs = parse_message_definition(text).unwrap();
        assert_eq!(defs[0].fields[0].kind, FieldKind::Primitive(Primitive::Json));
        assert_eq!(
            defs[0].fields[1].kind,
            FieldKind::Primitive(Primitive::String)
        );
    }

    #[test]
    fn test_trailing_separator_no_phantom_definition() {
        let defs = parse_message_definition("uint8 a\n===\nMSG: pkg/T\nuint8 b\n===\n").unwrap();
        assert_eq!(defs.len(), 2);
    }

    #[test]
    fn test_cycle_detected() {
        let text = "\
pkg/A a
===
MSG: pkg/A
pkg/B b
===
MSG: pkg/B
pkg/A a
";
        let err = parse_message_definition(text).unwrap_err();
        assert!(matches!(err, BagError::MalformedSchema { .. }));
    }

    #[test]
    fn test_malformed_line_fails() {
        let err = parse_message_definition("not-a-valid-line!!").unwrap_err();
        assert!(matches!(err, BagError::SchemaParse { .. }));
    }

    #[test]
    fn test_time_and_duration_fields() {
        let defs = parse_message_definition("time stamp\nduration age").unwrap();
        assert_eq!(defs[0].fields[0].kind, FieldKind::Primitive(Primitive::Time));
        assert_eq!(
            defs[0].fields[1].kind,
            FieldKind::Primitive(Primitive::Duration)
        );
    }
}
