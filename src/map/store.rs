//! Map Store
//!
//! Key-value façade over the storage engine.

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{NorError, Result};
use crate::flash::FlashDevice;
use crate::storage::StorageEngine;

use super::{MapEntry, MapLog, ReplayEnd};

/// Key-value map persisted as a record log
///
/// ## Session Model
///
/// `open()` replays the log once into a `MapLog`. Adds and deletes go
/// straight to the storage engine and do **not** change that log: the flash
/// is the source of truth, and `reload()` flushes and replays to pick up
/// this session's writes.
///
/// If replay stopped at a record that is valid on flash but is not a map
/// entry, appends are refused: they would land after it and never replay.
pub struct MapStore<D: FlashDevice> {
    storage: StorageEngine<D>,
    log: MapLog,
}

impl<D: FlashDevice> MapStore<D> {
    /// Open storage on `device` and replay the log
    pub fn open(device: D, config: &Config) -> Result<Self> {
        let mut storage = StorageEngine::open(device, config)?;
        let log = MapLog::replay(&mut storage)?;

        info!(entries = log.len(), "map opened");
        Ok(Self { storage, log })
    }

    /// Append a string entry. Returns the record index.
    pub fn add_string(&mut self, key: &str, value: &str) -> Result<u32> {
        let entry = MapEntry::string(key, value)?;
        self.append(&entry)
    }

    /// Append an integer entry. Returns the record index.
    pub fn add_integer(&mut self, key: &str, value: u32) -> Result<u32> {
        let entry = MapEntry::integer(key, value)?;
        self.append(&entry)
    }

    /// Append a tombstone for `key`
    ///
    /// Deleting a key with no live value still appends the marker.
    pub fn delete(&mut self, key: &str) -> Result<u32> {
        let entry = MapEntry::tombstone(key)?;
        self.append(&entry)
    }

    /// Flush buffered entries to flash
    pub fn flush(&mut self) -> Result<()> {
        self.storage.flush()
    }

    /// Flush, then rebuild the replayed log from flash
    pub fn reload(&mut self) -> Result<&MapLog> {
        self.storage.flush()?;
        self.log = MapLog::replay(&mut self.storage)?;
        Ok(&self.log)
    }

    /// The log as of the last open/reload
    pub fn log(&self) -> &MapLog {
        &self.log
    }

    /// Print every replayed entry to stdout
    pub fn print_all(&self) {
        print!("{}", self.log);
    }

    pub fn storage(&self) -> &StorageEngine<D> {
        &self.storage
    }

    /// Release the replayed log, close storage, and return the device
    pub fn close(self) -> Result<D> {
        drop(self.log);
        self.storage.close()
    }

    fn append(&mut self, entry: &MapEntry) -> Result<u32> {
        // A record the engine accepts but the map cannot decode hides
        // everything after it from replay
        if let ReplayEnd::Invalid { index, reason } = self.log.end() {
            if *index < self.storage.record_count() {
                return Err(NorError::Integrity(format!(
                    "log holds an undecodable entry at {}: {}",
                    index, reason
                )));
            }
        }

        let index = self.storage.append_record(&entry.encode())?;
        debug!(index, key = entry.key(), deleted = entry.is_deleted(), "entry appended");
        Ok(index)
    }
}
