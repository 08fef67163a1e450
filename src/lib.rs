//! # norkv
//!
//! A small key-value map persisted on raw NOR flash:
//! - Append-only record log (bits only ever go 1 → 0 between erases)
//! - One-sector write-back cache, flushed as a unit
//! - CRC32-validated records and tail detection on startup
//! - Full log replay into an in-memory view with last-write-wins lookups
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Front End (shell / norkv-cli)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ add / delete / reload / print
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      MapStore                                │
//! │          (MapEntry codec + replayed MapLog)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ fixed-size payloads
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   StorageEngine                              │
//! │       (record log, write cursor, sector cache)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ read / write / sector erase
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    FlashDevice                               │
//! │           (hardware, MemFlash, FileFlash)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod flash;
pub mod storage;
pub mod map;
pub mod shell;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{NorError, Result};
pub use config::Config;
pub use flash::{FileFlash, FlashDevice, FlashError, FlashGeometry, MemFlash};
pub use storage::{LogEnd, StorageEngine};
pub use map::{EntryValue, MapEntry, MapLog, MapStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of norkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
