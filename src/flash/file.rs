//! File-backed NOR flash
//!
//! Persists a flash image on the host filesystem so a session survives
//! process restarts. Same rules as real NOR: erase to `0xFF`, program
//! clears bits only, one page per write.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{nor_program, FlashDevice, FlashError, FlashGeometry, ERASED_BYTE};

/// NOR flash simulated by an image file
pub struct FileFlash {
    path: PathBuf,
    geometry: FlashGeometry,
    file: Option<File>,
}

impl FileFlash {
    /// Describe a device backed by `path`. The file is opened by `init()`.
    pub fn new(path: impl Into<PathBuf>, geometry: FlashGeometry) -> Self {
        Self {
            path: path.into(),
            geometry,
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File, FlashError> {
        self.file.as_mut().ok_or(FlashError::NotInitialized)
    }

    /// Create a fully erased image
    fn create_image(&self) -> Result<File, FlashError> {
        debug!(path = %self.path.display(), size = self.geometry.total_size, "creating flash image");
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(&vec![ERASED_BYTE; self.geometry.total_size as usize])?;
        file.sync_all()?;
        Ok(file)
    }

    fn fill_erased(&mut self, address: u32, len: usize) -> Result<(), FlashError> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(address as u64))?;
        file.write_all(&vec![ERASED_BYTE; len])?;
        Ok(())
    }
}

impl FlashDevice for FileFlash {
    fn geometry(&self) -> FlashGeometry {
        self.geometry
    }

    fn init(&mut self) -> Result<(), FlashError> {
        if self.file.is_some() {
            return Ok(());
        }

        let file = if self.path.exists() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            let actual = file.metadata()?.len();
            let expected = self.geometry.total_size as u64;
            if actual != expected {
                return Err(FlashError::ImageSize { expected, actual });
            }
            file
        } else {
            self.create_image()?
        };

        self.file = Some(file);
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), FlashError> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        self.geometry.check_range(address, buf.len())?;
        let file = self.file()?;
        file.seek(SeekFrom::Start(address as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        self.geometry.check_range(address, data.len())?;
        self.geometry.check_page(address, data.len())?;

        let mut cells = vec![0u8; data.len()];
        self.read(address, &mut cells)?;
        nor_program(&mut cells, address, data)?;

        let file = self.file()?;
        file.seek(SeekFrom::Start(address as u64))?;
        file.write_all(&cells)?;
        Ok(())
    }

    fn sector_erase(&mut self, sector: u32) -> Result<(), FlashError> {
        self.geometry.check_sector(sector)?;
        let start = self.geometry.sector_start(sector);
        self.fill_erased(start, self.geometry.sector_size as usize)
    }

    fn chip_erase(&mut self) -> Result<(), FlashError> {
        self.fill_erased(0, self.geometry.total_size as usize)?;
        self.file()?.sync_data()?;
        Ok(())
    }
}
