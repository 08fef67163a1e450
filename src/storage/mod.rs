//! Storage Module
//!
//! Log-structured record storage on NOR flash.
//!
//! ## Responsibilities
//! - Fixed-size records with CRC32 validation
//! - Tail detection by scanning from address 0
//! - Sector-granular write-back cache
//! - Indexed record reads straight from flash
//!
//! ## Log Layout
//! ```text
//! address 0
//! ┌──────────────────────────────────────────────────┐
//! │ Record 0                                         │
//! │ ┌──────────┬──────────────────┬────────┬───────┐ │
//! │ │Magic (4) │ Payload (102)    │Len (4) │CRC (4)│ │
//! │ └──────────┴──────────────────┴────────┴───────┘ │
//! ├──────────────────────────────────────────────────┤
//! │ Record 1   (address = 1 * 114)                   │
//! ├──────────────────────────────────────────────────┤
//! │ ...        records may straddle sector borders   │
//! ├──────────────────────────────────────────────────┤
//! │ 0xFF 0xFF 0xFF ...  (erased: end of log)         │
//! └──────────────────────────────────────────────────┘
//! ```

mod cache;
mod engine;
pub mod record;

pub use engine::StorageEngine;
pub use record::{
    checksum, Corruption, SlotState, StoredRecord, PAYLOAD_CAPACITY, RECORD_MAGIC, RECORD_SIZE,
};

/// Why the startup scan stopped
///
/// A corrupt slot truncates the log exactly like an erased one; this value
/// only lets callers tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEnd {
    /// Reached an untouched slot
    Erased,

    /// Reached a slot that failed validation
    Corrupt { index: u32, reason: Corruption },

    /// Every slot of the log region holds a valid record
    Full,
}
