// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Record header-field block codec.
//!
//! Every bag record header (and every Connection data blob) is a
//! concatenation of `<u32 len LE><key>=<value bytes>` fields. Keys are
//! ASCII; values are opaque bytes whose typed meaning depends on the
//! enclosing record kind. Unknown keys are kept and ignored.

use crate::core::{BagError, Result, Time};

/// Decoded header-field block: an insertion-ordered key -> bytes mapping.
///
/// Duplicate keys are not meaningful in the format; on decode the last
/// occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    entries: Vec<(String, Vec<u8>)>,
}

impl HeaderFields {
    /// Create an empty field block.
    pub fn new() -> Self {
        HeaderFields::default()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the block is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a field; replaces any existing value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Insert a single-byte field.
    pub fn insert_u8(&mut self, key: impl Into<String>, value: u8) {
        self.insert(key, vec![value]);
    }

    /// Insert a little-endian u32 field.
    pub fn insert_u32(&mut self, key: impl Into<String>, value: u32) {
        self.insert(key, value.to_le_bytes().to_vec());
    }

    /// Insert a little-endian u64 field.
    pub fn insert_u64(&mut self, key: impl Into<String>, value: u64) {
        self.insert(key, value.to_le_bytes().to_vec());
    }

    /// Insert a timestamp field (u32 sec, u32 nsec).
    pub fn insert_time(&mut self, key: impl Into<String>, value: Time) {
        let mut bytes = value.sec.to_le_bytes().to_vec();
        bytes.extend_from_slice(&value.nsec.to_le_bytes());
        self.insert(key, bytes);
    }

    /// Insert an unprefixed ASCII string field.
    pub fn insert_str(&mut self, key: impl Into<String>, value: &str) {
        self.insert(key, value.as_bytes().to_vec());
    }

    /// Look up a field's raw bytes.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Read a required single-byte field.
    pub fn req_u8(&self, key: &str) -> Result<u8> {
        match self.get(key) {
            Some([b]) => Ok(*b),
            _ => Err(BagError::missing_field(key)),
        }
    }

    /// Read a required little-endian u32 field.
    pub fn req_u32(&self, key: &str) -> Result<u32> {
        match self.get(key) {
            Some(v) if v.len() == 4 => Ok(u32::from_le_bytes(v.try_into().expect("length checked"))),
            _ => Err(BagError::missing_field(key)),
        }
    }

    /// Read a required little-endian u64 field.
    pub fn req_u64(&self, key: &str) -> Result<u64> {
        match self.get(key) {
            Some(v) if v.len() == 8 => Ok(u64::from_le_bytes(v.try_into().expect("length checked"))),
            _ => Err(BagError::missing_field(key)),
        }
    }

    /// Read a required timestamp field (u32 sec, u32 nsec).
    pub fn req_time(&self, key: &str) -> Result<Time> {
        match self.get(key) {
            Some(v) if v.len() == 8 => {
                let sec = u32::from_le_bytes(v[..4].try_into().expect("length checked"));
                let nsec = u32::from_le_bytes(v[4..].try_into().expect("length checked"));
                Ok(Time::new(sec, nsec))
            }
            _ => Err(BagError::missing_field(key)),
        }
    }

    /// Read a required string field.
    pub fn req_str(&self, key: &str) -> Result<String> {
        self.get(key)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .ok_or_else(|| BagError::missing_field(key))
    }

    /// Read an optional string field.
    pub fn opt_str(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| String::from_utf8_lossy(v).into_owned())
    }
}

/// Decode a header-field block.
pub fn extract_fields(buf: &[u8]) -> Result<HeaderFields> {
    let mut fields = HeaderFields::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let remaining = buf.len() - offset;
        if remaining < 4 {
            return Err(BagError::TruncatedHeader { available: remaining });
        }
        let len =
            u32::from_le_bytes(buf[offset..offset + 4].try_into().expect("length checked")) as usize;
        offset += 4;

        if len > buf.len() - offset {
            return Err(BagError::CorruptHeader {
                declared: len,
                available: buf.len() - offset,
            });
        }
        let field = &buf[offset..offset + len];
        offset += len;

        let eq = field
            .iter()
            .position(|&b| b == b'=')
            .ok_or(BagError::MissingEquals)?;
        let key = String::from_utf8_lossy(&field[..eq]).into_owned();
        fields.insert(key, field[eq + 1..].to_vec());
    }

    Ok(fields)
}

/// Encode a header-field block; the exact inverse of [`extract_fields`]
/// for unique ASCII keys.
pub fn encode_fields(fields: &HeaderFields) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in fields.iter() {
        let len = (key.len() + 1 + value.len()) as u32;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(key.as_bytes());
        out.push(b'=');
        out.extend_from_slice(value);
    }
    out
}
