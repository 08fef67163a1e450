//! Sector cache
//!
//! In-memory mirror of the one sector currently being appended to.

use tracing::{debug, warn};

use crate::error::Result;
use crate::flash::{FlashDevice, FlashGeometry, ERASED_BYTE};

pub(crate) struct SectorCache {
    /// Sector index this buffer mirrors
    sector: u32,
    data: Vec<u8>,
    /// Staged bytes not yet programmed to flash
    dirty: bool,
}

impl SectorCache {
    /// Load `sector` from the device, falling back to the erased pattern
    ///
    /// Only the first `log_len` bytes belong to the log. Anything after them
    /// is reset to erased, and the cache starts dirty if that dropped stale
    /// data, so the next flush clears it from flash too.
    pub(crate) fn load<D: FlashDevice>(
        device: &mut D,
        geometry: &FlashGeometry,
        sector: u32,
        log_len: usize,
    ) -> Self {
        let mut data = vec![ERASED_BYTE; geometry.sector_size as usize];

        if let Err(e) = device.read_sector(sector, &mut data) {
            warn!(sector, error = %e, "sector read failed, cache starts erased");
            data.fill(ERASED_BYTE);
        }

        let tail = &mut data[log_len.min(geometry.sector_size as usize)..];
        let dirty = tail.iter().any(|&b| b != ERASED_BYTE);
        if dirty {
            debug!(sector, offset = log_len, "dropping stale bytes past the log tail");
            tail.fill(ERASED_BYTE);
        }

        Self { sector, data, dirty }
    }

    pub(crate) fn sector(&self) -> u32 {
        self.sector
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Copy `bytes` into the buffer at `offset` within the sector
    pub(crate) fn stage(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
    }

    /// Erase the sector and program the buffer back, one page at a time.
    ///
    /// Pages that are entirely erased are skipped. On error the cache stays
    /// dirty so the whole flush can be retried.
    pub(crate) fn write_back<D: FlashDevice>(&mut self, device: &mut D, geometry: &FlashGeometry) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        device.sector_erase(self.sector)?;

        let base = geometry.sector_start(self.sector);
        let page_size = geometry.page_size as usize;
        let mut programmed = 0;

        for (i, page) in self.data.chunks(page_size).enumerate() {
            if page.iter().all(|&b| b == ERASED_BYTE) {
                continue;
            }
            device.write(base + (i * page_size) as u32, page)?;
            programmed += 1;
        }

        debug!(sector = self.sector, pages = programmed, "sector flushed");
        self.dirty = false;
        Ok(())
    }
}
