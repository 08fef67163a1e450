//! Map Module
//!
//! Key-value semantics on top of the record log.
//!
//! ## Responsibilities
//! - Serialize entries into fixed 102-byte payloads
//! - Replay the full log into an ordered in-memory sequence
//! - Lookups by position and by key (last write wins)
//! - Deletion through tombstone entries
//!
//! ## Entry Layout
//! ```text
//! ┌────────┬─────────┬───────────┬──────────────────┬───────────┐
//! │Kind (1)│Deleted 1│ Key (32)  │ Str value (64)   │U32 (4) LE │
//! └────────┴─────────┴───────────┴──────────────────┴───────────┘
//! ```

mod entry;
mod replay;
mod store;

pub use entry::{
    validate_key, validate_str_value, EntryKind, EntryValue, MapEntry, ENTRY_SIZE, MAX_KEY_LEN,
    MAX_STR_VALUE_LEN,
};
pub use replay::{MapLog, ReplayEnd};
pub use store::MapStore;
