//! Storage Engine
//!
//! Append-only record log over a `FlashDevice`.
//!
//! ## Responsibilities
//! - Find the log tail on open by validating slots from address 0
//! - Buffer appends in a one-sector cache
//! - Replace the cached sector on flush (erase, then program)
//! - Read validated records back by index

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{NorError, Result};
use crate::flash::{FlashDevice, FlashGeometry};

use super::cache::SectorCache;
use super::record::{SlotState, StoredRecord, RECORD_SIZE};
use super::LogEnd;

/// The record log
///
/// ## Ownership
///
/// The engine owns its device by value, so only one engine can ever be open
/// against a backing store. A failed `open()` returns the error and no engine;
/// `close()` consumes the engine and hands the device back.
///
/// ## Durability
///
/// `append_record()` only stages bytes in the sector cache. Records become
/// durable, and visible to `read_record()`, after `flush()`. A flush erases
/// the whole sector before programming it, so losing power in between loses
/// that sector.
pub struct StorageEngine<D: FlashDevice> {
    device: D,

    geometry: FlashGeometry,

    /// Maximum number of records in the log region
    capacity: u32,

    /// Byte address of the next free slot
    cursor: u32,

    /// Mirror of the sector being appended to
    cache: SectorCache,

    /// Why the startup scan stopped
    log_end: LogEnd,

    flush_on_close: bool,
}

impl<D: FlashDevice> StorageEngine<D> {
    /// Open the log on `device`
    ///
    /// On startup:
    /// 1. Initialize the device
    /// 2. Scan slots until the first erased or invalid one
    /// 3. Place the write cursor there
    /// 4. Load the cursor's sector into the cache
    ///
    /// A failed open deinitializes the device and drops it. There is no
    /// engine to hand it back from.
    pub fn open(mut device: D, config: &Config) -> Result<Self> {
        // Step 1: Bring up the device
        device.init()?;

        match Self::recover(&mut device, config) {
            Ok((geometry, capacity, cursor, log_end, cache)) => Ok(Self {
                device,
                geometry,
                capacity,
                cursor,
                cache,
                log_end,
                flush_on_close: config.flush_on_close,
            }),
            Err(e) => {
                if let Err(deinit_err) = device.deinit() {
                    warn!(error = %deinit_err, "deinit after failed open also failed");
                }
                Err(e)
            }
        }
    }

    /// Steps 2-4 of `open()`
    fn recover(
        device: &mut D,
        config: &Config,
    ) -> Result<(FlashGeometry, u32, u32, LogEnd, SectorCache)> {
        let geometry = device.geometry();
        geometry.validate().map_err(NorError::Config)?;

        let slots = geometry.total_size / RECORD_SIZE as u32;
        let capacity = match config.max_records {
            Some(0) => return Err(NorError::Config("max_records must be at least 1".to_string())),
            Some(max) => max.min(slots),
            None => slots,
        };

        // Step 2: Locate the tail
        let (count, log_end) = scan(device, capacity)?;

        if let LogEnd::Corrupt { index, reason } = log_end {
            warn!(index, %reason, "invalid record ends the log; later slots will be overwritten");
        }

        // Step 3: Cursor sits on the first unusable slot
        let cursor = count * RECORD_SIZE as u32;

        // Step 4: Cache the sector the next append lands in
        let sector = geometry.sector_of(cursor.min(geometry.total_size - 1));
        let log_len = (cursor - geometry.sector_start(sector)) as usize;
        let cache = SectorCache::load(device, &geometry, sector, log_len);

        info!(records = count, capacity, cursor, sector, "storage opened");

        Ok((geometry, capacity, cursor, log_end, cache))
    }

    /// Append a payload and return its record index
    ///
    /// The record is buffered; call `flush()` to make it durable.
    pub fn append_record(&mut self, payload: &[u8]) -> Result<u32> {
        let record = StoredRecord::new(payload)?;

        let index = self.record_count();
        if index >= self.capacity {
            return Err(NorError::StorageFull {
                capacity: self.capacity,
            });
        }

        let bytes = record.encode();
        self.stage(self.cursor, &bytes)?;
        self.cursor += RECORD_SIZE as u32;

        debug!(index, len = payload.len(), "record appended");
        Ok(index)
    }

    /// Write the cached sector back to flash
    ///
    /// No-op when nothing is staged. On failure the cache stays dirty and the
    /// durability of that sector is unknown until a flush succeeds.
    pub fn flush(&mut self) -> Result<()> {
        self.cache.write_back(&mut self.device, &self.geometry)?;

        // A tail on a sector boundary leaves the next slot in an uncached
        // sector; clear anything stale there too.
        if self.cursor < self.geometry.total_size {
            let tail_sector = self.geometry.sector_of(self.cursor);
            if tail_sector != self.cache.sector() {
                self.cache = SectorCache::load(&mut self.device, &self.geometry, tail_sector, 0);
                self.cache.write_back(&mut self.device, &self.geometry)?;
            }
        }
        Ok(())
    }

    /// Read and validate the record at `index` directly from flash
    ///
    /// Returns:
    /// - `Ok(payload)` for a valid record
    /// - `Err(NotFound)` for an erased slot or an index past the log region
    /// - `Err(Integrity)` for a slot that fails validation
    pub fn read_record(&mut self, index: u32) -> Result<Vec<u8>> {
        if index >= self.capacity {
            return Err(NorError::NotFound);
        }

        match read_slot(&mut self.device, index)? {
            SlotState::Valid(record) => Ok(record.into_payload().to_vec()),
            SlotState::Erased => Err(NorError::NotFound),
            SlotState::Corrupt(reason) => Err(NorError::Integrity(format!(
                "record {}: {}",
                index, reason
            ))),
        }
    }

    /// Close the log and return the device
    ///
    /// A failed close drops the engine and the device with it. To retry a
    /// failing flush, call `flush()` before closing.
    pub fn close(mut self) -> Result<D> {
        if self.flush_on_close {
            self.flush()?;
        } else if self.cache.is_dirty() {
            warn!(sector = self.cache.sector(), "closing with unflushed records");
        }

        self.device.deinit()?;
        info!(records = self.record_count(), "storage closed");
        Ok(self.device)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Records in the log, including buffered ones
    pub fn record_count(&self) -> u32 {
        self.cursor / RECORD_SIZE as u32
    }

    /// Byte address of the next append
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    /// Why the startup scan stopped
    pub fn log_end(&self) -> LogEnd {
        self.log_end
    }

    /// Whether appended records are waiting for a flush
    pub fn is_dirty(&self) -> bool {
        self.cache.is_dirty()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Copy `bytes` into the cache starting at `address`.
    ///
    /// Each time the range enters a sector other than the cached one, the
    /// cached sector is flushed and the new one loaded. A record straddling a
    /// boundary is split between the two sectors.
    fn stage(&mut self, mut address: u32, mut bytes: &[u8]) -> Result<()> {
        let sector_size = self.geometry.sector_size;

        while !bytes.is_empty() {
            let sector = self.geometry.sector_of(address);
            if sector != self.cache.sector() {
                self.flush()?;
                // The range enters at the sector start, so nothing here is log yet
                self.cache = SectorCache::load(&mut self.device, &self.geometry, sector, 0);
            }

            let offset = address - self.geometry.sector_start(sector);
            let len = bytes.len().min((sector_size - offset) as usize);

            self.cache.stage(offset as usize, &bytes[..len]);

            address += len as u32;
            bytes = &bytes[len..];
        }

        Ok(())
    }
}

/// Read one slot from flash and classify it
fn read_slot<D: FlashDevice>(device: &mut D, index: u32) -> Result<SlotState> {
    let mut slot = [0u8; RECORD_SIZE];
    device.read(index * RECORD_SIZE as u32, &mut slot)?;
    Ok(StoredRecord::decode(&slot))
}

/// Count valid records from slot 0 and report why the scan stopped
fn scan<D: FlashDevice>(device: &mut D, capacity: u32) -> Result<(u32, LogEnd)> {
    for index in 0..capacity {
        match read_slot(device, index)? {
            SlotState::Valid(_) => continue,
            SlotState::Erased => return Ok((index, LogEnd::Erased)),
            SlotState::Corrupt(reason) => return Ok((index, LogEnd::Corrupt { index, reason })),
        }
    }
    Ok((capacity, LogEnd::Full))
}
