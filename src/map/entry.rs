//! Map entry codec
//!
//! A MapEntry always serializes to exactly `ENTRY_SIZE` bytes, which is the
//! full payload capacity of one stored record.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{NorError, Result};
use crate::storage::PAYLOAD_CAPACITY;

/// Longest key in bytes
pub const MAX_KEY_LEN: usize = 32;

/// Longest string value in bytes
pub const MAX_STR_VALUE_LEN: usize = 64;

/// Kind (1) + Deleted (1) + Key (32) + String value (64) + U32 value (4) = 102 bytes
pub const ENTRY_SIZE: usize = 1 + 1 + MAX_KEY_LEN + MAX_STR_VALUE_LEN + 4;

const _: () = assert!(ENTRY_SIZE == PAYLOAD_CAPACITY);

const NOT_DELETED: u8 = 0;
const DELETED: u8 = 1;

/// Value discriminant as stored on flash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    Str = 0,
    U32 = 1,
}

impl EntryKind {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(EntryKind::Str),
            1 => Ok(EntryKind::U32),
            _ => Err(NorError::Integrity(format!("unknown entry kind {}", value))),
        }
    }
}

/// A stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    Str(String),
    U32(u32),
}

impl EntryValue {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryValue::Str(_) => EntryKind::Str,
            EntryValue::U32(_) => EntryKind::U32,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntryValue::Str(s) => Some(s),
            EntryValue::U32(_) => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            EntryValue::U32(v) => Some(*v),
            EntryValue::Str(_) => None,
        }
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryValue::Str(s) => write!(f, "str: {}", s),
            EntryValue::U32(v) => write!(f, "u32: {}", v),
        }
    }
}

/// One key/value snapshot in the log
///
/// A tombstone (`is_deleted()`) records that its key has been removed; it
/// carries an empty string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    key: String,
    value: EntryValue,
    deleted: bool,
}

impl MapEntry {
    /// Entry with a string value
    pub fn string(key: &str, value: &str) -> Result<Self> {
        validate_key(key)?;
        validate_str_value(value)?;
        Ok(Self {
            key: key.to_string(),
            value: EntryValue::Str(value.to_string()),
            deleted: false,
        })
    }

    /// Entry with an integer value
    pub fn integer(key: &str, value: u32) -> Result<Self> {
        validate_key(key)?;
        Ok(Self {
            key: key.to_string(),
            value: EntryValue::U32(value),
            deleted: false,
        })
    }

    /// Deletion marker for `key`
    pub fn tombstone(key: &str) -> Result<Self> {
        validate_key(key)?;
        Ok(Self {
            key: key.to_string(),
            value: EntryValue::Str(String::new()),
            deleted: true,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &EntryValue {
        &self.value
    }

    pub fn kind(&self) -> EntryKind {
        self.value.kind()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Encode to exactly `ENTRY_SIZE` bytes
    ///
    /// Format: [kind: u8][deleted: u8][key: 32][value_str: 64][value_u32: u32 LE]
    /// Strings are NUL padded; the value region not selected by `kind` is zero.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENTRY_SIZE);

        buf.put_u8(self.kind() as u8);
        buf.put_u8(if self.deleted { DELETED } else { NOT_DELETED });
        put_padded(&mut buf, self.key.as_bytes(), MAX_KEY_LEN);

        match &self.value {
            EntryValue::Str(s) => {
                put_padded(&mut buf, s.as_bytes(), MAX_STR_VALUE_LEN);
                buf.put_u32_le(0);
            }
            EntryValue::U32(v) => {
                buf.put_bytes(0, MAX_STR_VALUE_LEN);
                buf.put_u32_le(*v);
            }
        }

        buf.freeze()
    }

    /// Decode a record payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != ENTRY_SIZE {
            return Err(NorError::Integrity(format!(
                "entry payload is {} bytes, expected {}",
                payload.len(),
                ENTRY_SIZE
            )));
        }

        let mut buf = payload;
        let kind = EntryKind::from_u8(buf.get_u8())?;
        let deleted = match buf.get_u8() {
            NOT_DELETED => false,
            DELETED => true,
            other => {
                return Err(NorError::Integrity(format!("bad deleted flag {}", other)));
            }
        };

        let key = read_padded(&payload[2..2 + MAX_KEY_LEN], "key")?;
        buf.advance(MAX_KEY_LEN);
        let value_str = read_padded(&payload[2 + MAX_KEY_LEN..2 + MAX_KEY_LEN + MAX_STR_VALUE_LEN], "value")?;
        buf.advance(MAX_STR_VALUE_LEN);
        let value_u32 = buf.get_u32_le();

        if key.is_empty() {
            return Err(NorError::Integrity("empty key".to_string()));
        }

        let value = match kind {
            EntryKind::Str => EntryValue::Str(value_str),
            EntryKind::U32 => EntryValue::U32(value_u32),
        };

        Ok(Self { key, value, deleted })
    }
}

impl fmt::Display for MapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deleted {
            write!(f, "key: {}, deleted", self.key)
        } else {
            write!(f, "key: {}, {}", self.key, self.value)
        }
    }
}

// =============================================================================
// Bounds
// =============================================================================

/// Keys are 1..=32 ASCII bytes without NUL
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(NorError::Validation("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(NorError::Validation(format!(
            "key is {} bytes, limit is {}",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    validate_ascii(key, "key")
}

/// String values are 0..=64 ASCII bytes without NUL
pub fn validate_str_value(value: &str) -> Result<()> {
    if value.len() > MAX_STR_VALUE_LEN {
        return Err(NorError::Validation(format!(
            "value is {} bytes, limit is {}",
            value.len(),
            MAX_STR_VALUE_LEN
        )));
    }
    validate_ascii(value, "value")
}

fn validate_ascii(s: &str, what: &str) -> Result<()> {
    if !s.is_ascii() || s.contains('\0') {
        return Err(NorError::Validation(format!(
            "{} must be ASCII without NUL bytes",
            what
        )));
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn put_padded(buf: &mut BytesMut, bytes: &[u8], width: usize) {
    buf.put_slice(bytes);
    buf.put_bytes(0, width - bytes.len());
}

/// Text up to the first NUL
fn read_padded(field: &[u8], what: &str) -> Result<String> {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let text = &field[..len];
    if !text.is_ascii() {
        return Err(NorError::Integrity(format!("{} is not ASCII", what)));
    }
    Ok(String::from_utf8_lossy(text).into_owned())
}
