//! Tests for the simulated flash devices
//!
//! These tests verify:
//! - NOR write discipline (1 -> 0 only, page limit)
//! - Sector and chip erase
//! - Init/deinit gating and fault injection
//! - File-backed image creation and persistence

use norkv::flash::{FileFlash, FlashDevice, FlashError, FlashGeometry, MemFlash, ERASED_BYTE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn small_geometry() -> FlashGeometry {
    FlashGeometry::new(8 * 1024, 1024, 256)
}

fn ready_mem_flash() -> MemFlash {
    let mut flash = MemFlash::new(small_geometry());
    flash.init().unwrap();
    flash
}

// =============================================================================
// Geometry Tests
// =============================================================================

#[test]
fn test_default_geometry_is_mx25() {
    let geometry = FlashGeometry::default();

    assert_eq!(geometry.total_size, 256 * 1024);
    assert_eq!(geometry.sector_size, 4096);
    assert_eq!(geometry.page_size, 256);
    assert_eq!(geometry.sector_count(), 64);
    assert!(geometry.validate().is_ok());
}

#[test]
fn test_geometry_sector_math() {
    let geometry = small_geometry();

    assert_eq!(geometry.sector_of(0), 0);
    assert_eq!(geometry.sector_of(1023), 0);
    assert_eq!(geometry.sector_of(1024), 1);
    assert_eq!(geometry.sector_start(3), 3072);
}

#[test]
fn test_geometry_rejects_non_nesting_sizes() {
    assert!(FlashGeometry::new(8 * 1024, 1000, 256).validate().is_err());
    assert!(FlashGeometry::new(9000, 1024, 256).validate().is_err());
    assert!(FlashGeometry::new(8 * 1024, 1024, 0).validate().is_err());
}

#[test]
fn test_geometry_page_check() {
    let geometry = small_geometry();

    assert!(geometry.check_page(0, 256).is_ok());
    assert!(geometry.check_page(255, 1).is_ok());
    assert!(matches!(
        geometry.check_page(255, 2),
        Err(FlashError::PageOverrun { address: 255, len: 2 })
    ));
}

// =============================================================================
// MemFlash Tests
// =============================================================================

#[test]
fn test_mem_flash_starts_erased() {
    let mut flash = ready_mem_flash();
    let mut buf = [0u8; 64];

    flash.read(1000, &mut buf).unwrap();

    assert!(buf.iter().all(|&b| b == ERASED_BYTE));
}

#[test]
fn test_mem_flash_requires_init() {
    let mut flash = MemFlash::new(small_geometry());
    let mut buf = [0u8; 4];

    assert!(matches!(flash.read(0, &mut buf), Err(FlashError::NotInitialized)));
    assert!(matches!(flash.write(0, &[0]), Err(FlashError::NotInitialized)));

    flash.init().unwrap();
    assert!(flash.read(0, &mut buf).is_ok());

    flash.deinit().unwrap();
    assert!(!flash.is_initialized());
}

#[test]
fn test_mem_flash_write_clears_bits() {
    let mut flash = ready_mem_flash();

    flash.write(0, &[0xF0]).unwrap();
    flash.write(0, &[0x30]).unwrap();

    assert_eq!(flash.contents()[0], 0x30);
}

#[test]
fn test_mem_flash_rejects_zero_to_one() {
    let mut flash = ready_mem_flash();
    flash.write(0, &[0x30]).unwrap();

    let result = flash.write(0, &[0x0F]);

    assert!(matches!(result, Err(FlashError::WriteViolation { address: 0 })));
    assert_eq!(flash.contents()[0], 0x30);
}

#[test]
fn test_mem_flash_violation_leaves_whole_range_untouched() {
    let mut flash = ready_mem_flash();
    flash.write(10, &[0x00]).unwrap();

    let result = flash.write(8, &[0x11, 0x22, 0xFF, 0x33]);

    assert!(matches!(result, Err(FlashError::WriteViolation { address: 10 })));
    assert_eq!(&flash.contents()[8..12], &[0xFF, 0xFF, 0x00, 0xFF]);
}

#[test]
fn test_mem_flash_rejects_page_overrun() {
    let mut flash = ready_mem_flash();

    let result = flash.write(250, &[0u8; 10]);

    assert!(matches!(result, Err(FlashError::PageOverrun { .. })));
}

#[test]
fn test_mem_flash_rejects_out_of_bounds() {
    let mut flash = ready_mem_flash();
    let mut buf = [0u8; 16];

    let result = flash.read(8 * 1024 - 8, &mut buf);

    assert!(matches!(result, Err(FlashError::OutOfBounds { .. })));
}

#[test]
fn test_mem_flash_sector_erase_only_touches_sector() {
    let mut flash = ready_mem_flash();
    flash.write(0, &[0u8; 256]).unwrap();
    flash.write(1024, &[0u8; 256]).unwrap();

    flash.sector_erase(1).unwrap();

    assert!(flash.contents()[..256].iter().all(|&b| b == 0));
    assert!(flash.contents()[1024..2048].iter().all(|&b| b == ERASED_BYTE));
    assert_eq!(flash.stats().sector_erases, 1);
}

#[test]
fn test_mem_flash_erase_allows_rewrite() {
    let mut flash = ready_mem_flash();
    flash.write(0, &[0x00]).unwrap();
    flash.sector_erase(0).unwrap();

    flash.write(0, &[0xAB]).unwrap();

    assert_eq!(flash.contents()[0], 0xAB);
}

#[test]
fn test_mem_flash_invalid_sector() {
    let mut flash = ready_mem_flash();

    assert!(matches!(flash.sector_erase(8), Err(FlashError::InvalidSector(8))));
}

#[test]
fn test_mem_flash_chip_erase() {
    let mut flash = ready_mem_flash();
    flash.write(0, &[0u8; 16]).unwrap();
    flash.write(4096, &[0u8; 16]).unwrap();

    flash.chip_erase().unwrap();

    assert!(flash.contents().iter().all(|&b| b == ERASED_BYTE));
    assert_eq!(flash.stats().chip_erases, 1);
}

#[test]
fn test_mem_flash_read_sector() {
    let mut flash = ready_mem_flash();
    flash.write(2048, &[0x12, 0x34]).unwrap();
    let mut sector = vec![0u8; 1024];

    flash.read_sector(2, &mut sector).unwrap();

    assert_eq!(&sector[..2], &[0x12, 0x34]);
    assert_eq!(sector[2], ERASED_BYTE);
}

#[test]
fn test_mem_flash_fault_injection() {
    let mut flash = ready_mem_flash();
    flash.faults_mut().fail_write = true;

    assert!(matches!(flash.write(0, &[0]), Err(FlashError::Injected("write"))));

    flash.faults_mut().fail_write = false;
    assert!(flash.write(0, &[0]).is_ok());
}

#[test]
fn test_mem_flash_poke_ignores_nor_rules() {
    let mut flash = ready_mem_flash();
    flash.write(5, &[0x00]).unwrap();

    flash.poke(5, 0xFF).unwrap();

    assert_eq!(flash.contents()[5], 0xFF);
}

// =============================================================================
// FileFlash Tests
// =============================================================================

#[test]
fn test_file_flash_creates_erased_image() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flash.bin");
    let mut flash = FileFlash::new(&path, small_geometry());

    flash.init().unwrap();

    let image = std::fs::read(&path).unwrap();
    assert_eq!(image.len(), 8 * 1024);
    assert!(image.iter().all(|&b| b == ERASED_BYTE));
}

#[test]
fn test_file_flash_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    let mut flash = FileFlash::new(temp_dir.path().join("flash.bin"), small_geometry());
    let mut buf = [0u8; 4];

    assert!(matches!(flash.read(0, &mut buf), Err(FlashError::NotInitialized)));
}

#[test]
fn test_file_flash_persists_writes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flash.bin");

    {
        let mut flash = FileFlash::new(&path, small_geometry());
        flash.init().unwrap();
        flash.write(300, b"nor").unwrap();
        flash.deinit().unwrap();
    }

    let mut flash = FileFlash::new(&path, small_geometry());
    flash.init().unwrap();
    let mut buf = [0u8; 3];
    flash.read(300, &mut buf).unwrap();

    assert_eq!(&buf, b"nor");
}

#[test]
fn test_file_flash_rejects_zero_to_one() {
    let temp_dir = TempDir::new().unwrap();
    let mut flash = FileFlash::new(temp_dir.path().join("flash.bin"), small_geometry());
    flash.init().unwrap();
    flash.write(0, &[0x00]).unwrap();

    let result = flash.write(0, &[0x01]);

    assert!(matches!(result, Err(FlashError::WriteViolation { address: 0 })));
}

#[test]
fn test_file_flash_sector_erase() {
    let temp_dir = TempDir::new().unwrap();
    let mut flash = FileFlash::new(temp_dir.path().join("flash.bin"), small_geometry());
    flash.init().unwrap();
    flash.write(1024, &[0x00; 8]).unwrap();

    flash.sector_erase(1).unwrap();
    flash.write(1024, &[0x5A]).unwrap();

    let mut buf = [0u8; 2];
    flash.read(1024, &mut buf).unwrap();
    assert_eq!(buf, [0x5A, ERASED_BYTE]);
}

#[test]
fn test_file_flash_rejects_wrong_image_size() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flash.bin");
    std::fs::write(&path, vec![ERASED_BYTE; 100]).unwrap();

    let mut flash = FileFlash::new(&path, small_geometry());

    assert!(matches!(
        flash.init(),
        Err(FlashError::ImageSize { expected: 8192, actual: 100 })
    ));
}
