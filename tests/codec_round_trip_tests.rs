// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Message codec round-trip and size-law tests.

use bagcodec::{
    parse_message_definition, BagError, FieldMap, MessageCodec, MessageReader, MessageWriter,
    Time, Value,
};

fn codec_for(text: &str) -> MessageCodec {
    MessageCodec::new(&parse_message_definition(text).unwrap()).unwrap()
}

fn field_map(entries: Vec<(&str, Value)>) -> FieldMap {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn assert_round_trip(codec: &MessageCodec, message: &FieldMap) {
    let bytes = codec.encode(message).unwrap();
    assert_eq!(
        codec.byte_size(message).unwrap(),
        bytes.len() as u64,
        "size law violated"
    );
    assert_eq!(&codec.decode(&bytes).unwrap(), message);
}

#[test]
fn test_primitive_wire_bytes() {
    let codec = codec_for("uint16 age");
    let message = field_map(vec![("age", Value::UInt16(5))]);
    assert_eq!(codec.encode(&message).unwrap(), [0x05, 0x00]);
    assert_eq!(codec.decode(&[0x05, 0x00]).unwrap(), message);
}

#[test]
fn test_every_primitive_round_trips() {
    let codec = codec_for(
        "bool flag\n\
         int8 a\nint16 b\nint32 c\nint64 d\n\
         uint8 e\nuint16 f\nuint32 g\nuint64 h\n\
         float32 i\nfloat64 j\n\
         string s\ntime t\nduration u\n",
    );
    let message = field_map(vec![
        ("flag", Value::Bool(true)),
        ("a", Value::Int8(-8)),
        ("b", Value::Int16(-1600)),
        ("c", Value::Int32(-320_000)),
        ("d", Value::Int64(-(1i64 << 62))),
        ("e", Value::UInt8(200)),
        ("f", Value::UInt16(60_000)),
        ("g", Value::UInt32(4_000_000_000)),
        ("h", Value::UInt64((1u64 << 63) + 99)),
        ("i", Value::Float32(1.25)),
        ("j", Value::Float64(-2.5e300)),
        ("s", Value::String("hello bag".to_string())),
        ("t", Value::Time(Time::new(1_700_000_000, 123_456_789))),
        ("u", Value::Duration(Time::new(3, 500_000_000))),
    ]);
    assert_round_trip(&codec, &message);
}

#[test]
fn test_byte_array_fast_path() {
    let codec = codec_for("uint8[] values\nuint8 after");
    let message = codec
        .decode(&[0x03, 0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x04])
        .unwrap();
    assert_eq!(message["values"], Value::Bytes(vec![1, 2, 3]));
    assert_eq!(message["after"], Value::UInt8(4));
    assert_round_trip(&codec, &message);
}

#[test]
fn test_nested_variable_arrays() {
    let text = "\
Account[] accounts
===
MSG: test_msgs/Account
string name
Photo[] photos
===
MSG: test_msgs/Photo
string url
uint8 rating
";
    let codec = codec_for(text);

    let photo = |url: &str, rating: u8| {
        Value::Struct(field_map(vec![
            ("url", Value::String(url.to_string())),
            ("rating", Value::UInt8(rating)),
        ]))
    };
    let message = field_map(vec![(
        "accounts",
        Value::Array(vec![
            Value::Struct(field_map(vec![
                ("name", Value::String("first".to_string())),
                ("photos", Value::Array(vec![photo("http://a", 5), photo("http://b", 3)])),
            ])),
            // Second account with an empty photos array.
            Value::Struct(field_map(vec![
                ("name", Value::String("second".to_string())),
                ("photos", Value::Array(vec![])),
            ])),
        ]),
    )]);
    assert_round_trip(&codec, &message);
}

#[test]
fn test_constants_never_on_the_wire() {
    let codec = codec_for("byte STALE=3\nbool level");
    let decoded = codec.decode(&[0x01]).unwrap();
    assert!(!decoded.contains_key("STALE"));
    assert_eq!(decoded["level"], Value::Bool(true));

    // The writer does not consume a field for the constant either.
    let bytes = codec.encode(&field_map(vec![("level", Value::Bool(true))])).unwrap();
    assert_eq!(bytes, [0x01]);
}

#[test]
fn test_fixed_arrays() {
    let codec = codec_for("float64[3] position\nuint8[2] pair");
    let message = field_map(vec![
        (
            "position",
            Value::Array(vec![
                Value::Float64(1.0),
                Value::Float64(2.0),
                Value::Float64(3.0),
            ]),
        ),
        ("pair", Value::Bytes(vec![9, 8])),
    ]);
    let bytes = codec.encode(&message).unwrap();
    // No length prefixes anywhere: 24 + 2 bytes.
    assert_eq!(bytes.len(), 26);
    assert_round_trip(&codec, &message);
}

#[test]
fn test_int64_full_precision() {
    let codec = codec_for("int64 big\nuint64 bigger");
    // Values beyond the 53-bit float-safe range must survive exactly.
    let message = field_map(vec![
        ("big", Value::Int64((1i64 << 53) + 1)),
        ("bigger", Value::UInt64((1u64 << 53) + 1)),
    ]);
    let bytes = codec.encode(&message).unwrap();
    let decoded = codec.decode(&bytes).unwrap();
    assert_eq!(decoded["big"].as_i64(), Some((1i64 << 53) + 1));
    assert_eq!(decoded["bigger"].as_u64(), Some((1u64 << 53) + 1));
}

#[test]
fn test_json_pseudo_primitive() {
    let codec = codec_for("#pragma rosbag_parse_json\nstring data");
    let message = field_map(vec![(
        "data",
        Value::Json(serde_json::json!({"speed": 1.5, "tags": ["a", "b"]})),
    )]);
    assert_round_trip(&codec, &message);
}

#[test]
fn test_complex_types_inlined_without_framing() {
    let text = "\
test_msgs/Header header
uint8 tail
===
MSG: test_msgs/Header
uint32 seq
time stamp
";
    let codec = codec_for(text);
    let message = field_map(vec![
        (
            "header",
            Value::Struct(field_map(vec![
                ("seq", Value::UInt32(7)),
                ("stamp", Value::Time(Time::new(1, 2))),
            ])),
        ),
        ("tail", Value::UInt8(0xAA)),
    ]);
    let bytes = codec.encode(&message).unwrap();
    // 4 (seq) + 8 (stamp) + 1 (tail): sub-message fields follow directly.
    assert_eq!(bytes.len(), 13);
    assert_round_trip(&codec, &message);
}

#[test]
fn test_decode_body_shorter_than_schema_fails() {
    let codec = codec_for("uint32 value");
    let err = codec.decode(&[0x01, 0x02]).unwrap_err();
    assert!(matches!(err, BagError::CodecMismatch { .. }));
}

#[test]
fn test_decode_trailing_bytes_fail() {
    let codec = codec_for("uint8 value");
    let err = codec.decode(&[0x01, 0x02]).unwrap_err();
    assert!(matches!(err, BagError::CodecMismatch { .. }));
}

#[test]
fn test_encode_mis_shaped_value_leaves_no_partial_output() {
    let codec = codec_for("uint8 good\nstring bad");
    let message = field_map(vec![
        ("good", Value::UInt8(1)),
        ("bad", Value::UInt32(2)),
    ]);
    let mut out = b"prefix".to_vec();
    let err = codec.encode_into(&message, &mut out).unwrap_err();
    assert!(matches!(err, BagError::CodecMismatch { .. }));
    assert_eq!(out, b"prefix");
}

#[test]
fn test_writer_reader_wrappers() {
    let defs = parse_message_definition("string name\nuint16 age").unwrap();
    let writer = MessageWriter::new(&defs).unwrap();
    let reader = MessageReader::new(&defs).unwrap();

    let message = field_map(vec![
        ("name", Value::String("rover".to_string())),
        ("age", Value::UInt16(4)),
    ]);
    let bytes = writer.write_message(&message).unwrap();
    assert_eq!(
        writer.calculate_byte_size(&message).unwrap(),
        bytes.len() as u64
    );
    assert_eq!(reader.read(&bytes).unwrap(), message);
}

#[test]
fn test_schema_without_root_rejected() {
    let defs = parse_message_definition("MSG: test_msgs/Only\nuint8 a").unwrap();
    let err = MessageCodec::new(&defs).unwrap_err();
    assert!(matches!(err, BagError::MalformedSchema { .. }));
}

#[test]
fn test_empty_variable_arrays() {
    let codec = codec_for("uint8[] bytes\nint32[] numbers\nstring[] names");
    let message = field_map(vec![
        ("bytes", Value::Bytes(vec![])),
        ("numbers", Value::Array(vec![])),
        ("names", Value::Array(vec![])),
    ]);
    let bytes = codec.encode(&message).unwrap();
    // Three zero length prefixes.
    assert_eq!(bytes, [0u8; 12]);
    assert_round_trip(&codec, &message);
}

#[test]
fn test_string_array_round_trip() {
    let codec = codec_for("string[] names");
    let message = field_map(vec![(
        "names",
        Value::Array(vec![
            Value::String("one".to_string()),
            Value::String("".to_string()),
            Value::String("three".to_string()),
        ]),
    )]);
    assert_round_trip(&codec, &message);
}
