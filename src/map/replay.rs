//! Replayed map log
//!
//! The in-memory image of every MapEntry in the record log, oldest first.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::{NorError, Result};
use crate::flash::FlashDevice;
use crate::storage::StorageEngine;

use super::{EntryValue, MapEntry};

/// Why replay stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayEnd {
    /// Reached an erased slot or the end of the log region
    Clean,

    /// Reached a record that failed validation or did not decode.
    /// Everything from `index` on is ignored.
    Invalid { index: u32, reason: String },
}

/// Entries in log order
#[derive(Debug, Clone)]
pub struct MapLog {
    entries: Vec<MapEntry>,
    end: ReplayEnd,
}

impl Default for MapLog {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            end: ReplayEnd::Clean,
        }
    }
}

impl MapLog {
    /// Rebuild the log by reading records from index 0 until the first read fails
    ///
    /// Only flushed records are seen. Device errors are returned; an invalid
    /// record ends the replay just like an erased slot.
    pub fn replay<D: FlashDevice>(storage: &mut StorageEngine<D>) -> Result<Self> {
        let mut entries = Vec::new();
        let mut index = 0u32;

        let end = loop {
            let payload = match storage.read_record(index) {
                Ok(payload) => payload,
                Err(NorError::NotFound) => break ReplayEnd::Clean,
                Err(NorError::Integrity(reason)) => break ReplayEnd::Invalid { index, reason },
                Err(e) => return Err(e),
            };

            match MapEntry::decode(&payload) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    break ReplayEnd::Invalid {
                        index,
                        reason: e.to_string(),
                    }
                }
            }
            index += 1;
        };

        if let ReplayEnd::Invalid { index, reason } = &end {
            warn!(index, %reason, "replay stopped at invalid record");
        }
        debug!(entries = entries.len(), "log replayed");

        Ok(Self { entries, end })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MapEntry> {
        self.entries.iter()
    }

    pub fn end(&self) -> &ReplayEnd {
        &self.end
    }

    /// The `index`-th entry in log order, tombstones included
    pub fn entry_at(&self, index: usize) -> Result<&MapEntry> {
        self.entries.get(index).ok_or(NorError::NotFound)
    }

    /// The most recent entry for `key`
    ///
    /// Later entries shadow earlier ones. If the most recent entry is a
    /// tombstone the key is reported as not found.
    pub fn find(&self, key: &str) -> Result<&MapEntry> {
        match self.entries.iter().rev().find(|e| e.key() == key) {
            Some(entry) if !entry.is_deleted() => Ok(entry),
            _ => Err(NorError::NotFound),
        }
    }

    /// Current value of every live key
    pub fn current(&self) -> BTreeMap<&str, &EntryValue> {
        let mut map = BTreeMap::new();
        for entry in &self.entries {
            if entry.is_deleted() {
                map.remove(entry.key());
            } else {
                map.insert(entry.key(), entry.value());
            }
        }
        map
    }
}

impl<'a> IntoIterator for &'a MapLog {
    type Item = &'a MapEntry;
    type IntoIter = std::slice::Iter<'a, MapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One line per entry: `Entry {n} -> key: {key}, {value}`
impl fmt::Display for MapLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            writeln!(f, "Entry {} -> {}", i, entry)?;
        }
        Ok(())
    }
}
