//! In-memory NOR flash
//!
//! RAM-backed device used as a test double. Enforces the NOR write rule and
//! the page program limit, counts operations and can inject failures.

use super::{nor_program, FlashDevice, FlashError, FlashGeometry, ERASED_BYTE};

/// Operation counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlashStats {
    pub reads: u64,
    pub writes: u64,
    pub sector_erases: u64,
    pub chip_erases: u64,
}

/// Which operations fail on purpose. Each flag stays set until cleared.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultPlan {
    pub fail_init: bool,
    pub fail_read: bool,
    pub fail_write: bool,
    pub fail_erase: bool,
}

/// RAM-backed NOR flash
#[derive(Debug, Clone)]
pub struct MemFlash {
    geometry: FlashGeometry,
    cells: Vec<u8>,
    initialized: bool,
    faults: FaultPlan,
    stats: FlashStats,
}

impl Default for MemFlash {
    fn default() -> Self {
        Self::new(FlashGeometry::default())
    }
}

impl MemFlash {
    /// Create an erased, uninitialized device
    pub fn new(geometry: FlashGeometry) -> Self {
        Self {
            geometry,
            cells: vec![ERASED_BYTE; geometry.total_size as usize],
            initialized: false,
            faults: FaultPlan::default(),
            stats: FlashStats::default(),
        }
    }

    pub fn faults_mut(&mut self) -> &mut FaultPlan {
        &mut self.faults
    }

    pub fn stats(&self) -> FlashStats {
        self.stats
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Raw view of every cell
    pub fn contents(&self) -> &[u8] {
        &self.cells
    }

    /// Overwrite one cell, ignoring NOR rules. Used to simulate bit rot.
    pub fn poke(&mut self, address: u32, value: u8) -> Result<(), FlashError> {
        self.geometry.check_range(address, 1)?;
        self.cells[address as usize] = value;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), FlashError> {
        if !self.initialized {
            return Err(FlashError::NotInitialized);
        }
        Ok(())
    }
}

impl FlashDevice for MemFlash {
    fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    fn init(&mut self) -> Result<(), FlashError> {
        if self.faults.fail_init {
            return Err(FlashError::Injected("init"));
        }
        self.initialized = true;
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), FlashError> {
        self.initialized = false;
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.ensure_ready()?;
        if self.faults.fail_read {
            return Err(FlashError::Injected("read"));
        }
        self.geometry.check_range(address, buf.len())?;

        let start = address as usize;
        buf.copy_from_slice(&self.cells[start..start + buf.len()]);
        self.stats.reads += 1;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.ensure_ready()?;
        if self.faults.fail_write {
            return Err(FlashError::Injected("write"));
        }
        self.geometry.check_range(address, data.len())?;
        self.geometry.check_page(address, data.len())?;

        let start = address as usize;
        nor_program(&mut self.cells[start..start + data.len()], address, data)?;
        self.stats.writes += 1;
        Ok(())
    }

    fn sector_erase(&mut self, sector: u32) -> Result<(), FlashError> {
        self.ensure_ready()?;
        if self.faults.fail_erase {
            return Err(FlashError::Injected("erase"));
        }
        self.geometry.check_sector(sector)?;

        let start = self.geometry.sector_start(sector) as usize;
        let end = start + self.geometry.sector_size as usize;
        self.cells[start..end].fill(ERASED_BYTE);
        self.stats.sector_erases += 1;
        Ok(())
    }

    fn chip_erase(&mut self) -> Result<(), FlashError> {
        self.ensure_ready()?;
        if self.faults.fail_erase {
            return Err(FlashError::Injected("erase"));
        }
        self.cells.fill(ERASED_BYTE);
        self.stats.chip_erases += 1;
        Ok(())
    }
}
