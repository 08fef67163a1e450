//! Stored record codec
//!
//! Fixed-width framing for one log slot.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::error::{NorError, Result};
use crate::flash::ERASED_BYTE;

/// Sentinel marking a slot as written
pub const RECORD_MAGIC: u32 = 0xDEAD_BEEF;

/// Payload bytes available in every record
pub const PAYLOAD_CAPACITY: usize = 102;

/// Magic (4) + Payload (102) + Length (4) + Checksum (4) = 114 bytes
pub const RECORD_SIZE: usize = 4 + PAYLOAD_CAPACITY + 4 + 4;

/// CRC-32 (IEEE, reflected 0xEDB88320, init and xor-out 0xFFFFFFFF)
pub fn checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Why a non-erased slot failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Corruption {
    #[error("bad magic {0:#010x}")]
    BadMagic(u32),

    #[error("length {0} exceeds payload capacity")]
    BadLength(u32),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// Result of decoding one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Valid(StoredRecord),
    /// Every byte still reads as erased flash
    Erased,
    Corrupt(Corruption),
}

/// A validated record: the payload and nothing else.
/// Magic, length and checksum are derived on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    payload: Bytes,
}

impl StoredRecord {
    /// Wrap a payload, rejecting anything over `PAYLOAD_CAPACITY`
    pub fn new(payload: &[u8]) -> Result<Self> {
        if payload.len() > PAYLOAD_CAPACITY {
            return Err(NorError::Validation(format!(
                "payload is {} bytes, capacity is {}",
                payload.len(),
                PAYLOAD_CAPACITY
            )));
        }
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub fn checksum(&self) -> u32 {
        checksum(&self.payload)
    }

    /// Encode to exactly `RECORD_SIZE` bytes
    ///
    /// Format: [magic: u32][payload: 102 bytes, zero padded][length: u32][crc32: u32]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RECORD_SIZE);

        buf.put_u32_le(RECORD_MAGIC);
        buf.put_slice(&self.payload);
        buf.put_bytes(0, PAYLOAD_CAPACITY - self.payload.len());
        buf.put_u32_le(self.payload.len() as u32);
        buf.put_u32_le(self.checksum());

        buf.freeze()
    }

    /// Classify a raw slot
    pub fn decode(slot: &[u8; RECORD_SIZE]) -> SlotState {
        if slot.iter().all(|&b| b == ERASED_BYTE) {
            return SlotState::Erased;
        }

        let mut buf = &slot[..];
        let magic = buf.get_u32_le();
        if magic != RECORD_MAGIC {
            return SlotState::Corrupt(Corruption::BadMagic(magic));
        }

        let payload_area = &slot[4..4 + PAYLOAD_CAPACITY];
        buf.advance(PAYLOAD_CAPACITY);
        let length = buf.get_u32_le();
        let stored = buf.get_u32_le();

        if length as usize > PAYLOAD_CAPACITY {
            return SlotState::Corrupt(Corruption::BadLength(length));
        }

        let payload = &payload_area[..length as usize];
        let computed = checksum(payload);
        if computed != stored {
            return SlotState::Corrupt(Corruption::ChecksumMismatch { stored, computed });
        }

        SlotState::Valid(StoredRecord {
            payload: Bytes::copy_from_slice(payload),
        })
    }
}
