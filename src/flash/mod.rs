//! Flash Device Module
//!
//! Interface to raw NOR flash plus two simulated devices.
//!
//! ## NOR Semantics
//! - Erase sets every byte of a sector to `0xFF`
//! - A write (page program) may only clear bits: 1 → 0
//! - A single write may not cross a page boundary
//!
//! ## Default Geometry (MX25-class part)
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Device: 256 KiB                              │
//! │ ┌──────────────┬──────────────┬─────┬──────┐ │
//! │ │ Sector 0     │ Sector 1     │ ... │ S 63 │ │
//! │ │ 4 KiB        │ 4 KiB        │     │      │ │
//! │ │ 16 x 256 B   │              │     │      │ │
//! │ │ pages        │              │     │      │ │
//! │ └──────────────┴──────────────┴─────┴──────┘ │
//! └──────────────────────────────────────────────┘
//! ```

mod file;
mod memory;

use thiserror::Error;

pub use file::FileFlash;
pub use memory::{FaultPlan, FlashStats, MemFlash};

/// Value of every cell after an erase
pub const ERASED_BYTE: u8 = 0xFF;

// =============================================================================
// Errors
// =============================================================================

/// Device-level failures
#[derive(Debug, Error)]
pub enum FlashError {
    #[error("device not initialized")]
    NotInitialized,

    #[error("range {address:#010x}+{len} outside device")]
    OutOfBounds { address: u32, len: usize },

    #[error("write {address:#010x}+{len} crosses a page boundary")]
    PageOverrun { address: u32, len: usize },

    /// Attempt to flip a bit from 0 to 1 without an erase
    #[error("write violation: 0 -> 1 transition at {address:#010x}")]
    WriteViolation { address: u32 },

    #[error("invalid sector index {0}")]
    InvalidSector(u32),

    #[error("flash image is {actual} bytes, expected {expected}")]
    ImageSize { expected: u64, actual: u64 },

    #[error("injected {0} fault")]
    Injected(&'static str),

    #[error("image I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Geometry
// =============================================================================

/// Physical layout of a flash device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashGeometry {
    /// Total device size in bytes
    pub total_size: u32,
    /// Erase unit in bytes
    pub sector_size: u32,
    /// Largest single program operation in bytes
    pub page_size: u32,
}

impl Default for FlashGeometry {
    fn default() -> Self {
        Self::MX25
    }
}

impl FlashGeometry {
    /// 256 KiB device, 4 KiB sectors, 256 byte pages
    pub const MX25: FlashGeometry = FlashGeometry {
        total_size: 256 * 1024,
        sector_size: 4 * 1024,
        page_size: 256,
    };

    pub const fn new(total_size: u32, sector_size: u32, page_size: u32) -> Self {
        Self {
            total_size,
            sector_size,
            page_size,
        }
    }

    /// Check that sizes nest: pages tile sectors, sectors tile the device.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.sector_size == 0 || self.total_size == 0 {
            return Err(format!("geometry sizes must be non-zero: {:?}", self));
        }
        if self.sector_size % self.page_size != 0 {
            return Err(format!(
                "sector size {} is not a multiple of page size {}",
                self.sector_size, self.page_size
            ));
        }
        if self.total_size % self.sector_size != 0 {
            return Err(format!(
                "device size {} is not a multiple of sector size {}",
                self.total_size, self.sector_size
            ));
        }
        Ok(())
    }

    pub fn sector_count(&self) -> u32 {
        self.total_size / self.sector_size
    }

    /// Sector index containing `address`
    pub fn sector_of(&self, address: u32) -> u32 {
        address / self.sector_size
    }

    /// First address of `sector`
    pub fn sector_start(&self, sector: u32) -> u32 {
        sector * self.sector_size
    }

    /// Fail unless `[address, address + len)` lies inside the device
    pub fn check_range(&self, address: u32, len: usize) -> Result<(), FlashError> {
        let end = address as u64 + len as u64;
        if end > self.total_size as u64 {
            return Err(FlashError::OutOfBounds { address, len });
        }
        Ok(())
    }

    /// Fail if `[address, address + len)` spans more than one page
    pub fn check_page(&self, address: u32, len: usize) -> Result<(), FlashError> {
        if len == 0 {
            return Ok(());
        }
        let first = address / self.page_size;
        let last = (address as u64 + len as u64 - 1) / self.page_size as u64;
        if first as u64 != last {
            return Err(FlashError::PageOverrun { address, len });
        }
        Ok(())
    }

    pub fn check_sector(&self, sector: u32) -> Result<(), FlashError> {
        if sector >= self.sector_count() {
            return Err(FlashError::InvalidSector(sector));
        }
        Ok(())
    }
}

// =============================================================================
// Device Trait
// =============================================================================

/// Raw NOR flash primitives consumed by the storage engine.
///
/// Implementations must reject a write that would set any bit from 0 to 1
/// and leave the device untouched when they do.
pub trait FlashDevice {
    fn geometry(&self) -> FlashGeometry;

    /// Bring the device up. Calling it twice is allowed.
    fn init(&mut self) -> Result<(), FlashError>;

    fn deinit(&mut self) -> Result<(), FlashError>;

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError>;

    /// Program `data` at `address`. Must stay within one page.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError>;

    fn sector_erase(&mut self, sector: u32) -> Result<(), FlashError>;

    fn chip_erase(&mut self) -> Result<(), FlashError>;

    /// Read a whole sector into `buf` (must be `sector_size` long)
    fn read_sector(&mut self, sector: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let geometry = self.geometry();
        geometry.check_sector(sector)?;
        self.read(geometry.sector_start(sector), buf)
    }
}

/// Apply a NOR program of `data` onto `cells` in place.
///
/// `cells` is the current content of the target range and `address` its
/// device address (for error reporting). Nothing is modified on violation.
pub fn nor_program(cells: &mut [u8], address: u32, data: &[u8]) -> Result<(), FlashError> {
    debug_assert_eq!(cells.len(), data.len());

    if let Some(pos) = cells
        .iter()
        .zip(data)
        .position(|(&current, &new)| !current & new != 0)
    {
        return Err(FlashError::WriteViolation {
            address: address + pos as u32,
        });
    }

    cells.copy_from_slice(data);
    Ok(())
}
