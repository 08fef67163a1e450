//! Configuration for norkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::flash::FlashGeometry;

/// Main configuration for a norkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Image file backing a `FileFlash` device
    pub flash_path: PathBuf,

    /// Size, sector and page layout of the flash device
    pub geometry: FlashGeometry,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Maximum number of records in the log region.
    /// `None` lets the log fill the whole device.
    pub max_records: Option<u32>,

    /// Flush the sector cache when the engine is closed
    pub flush_on_close: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flash_path: PathBuf::from("./norkv_flash.bin"),
            geometry: FlashGeometry::default(),
            max_records: None,
            flush_on_close: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the flash image file path
    pub fn flash_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.flash_path = path.into();
        self
    }

    /// Set the device geometry
    pub fn geometry(mut self, geometry: FlashGeometry) -> Self {
        self.config.geometry = geometry;
        self
    }

    /// Cap the log at `count` records
    pub fn max_records(mut self, count: u32) -> Self {
        self.config.max_records = Some(count);
        self
    }

    /// Whether `close()` flushes buffered records
    pub fn flush_on_close(mut self, flush: bool) -> Self {
        self.config.flush_on_close = flush;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
