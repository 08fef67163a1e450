//! Error types for norkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::flash::FlashError;

/// Result type alias using NorError
pub type Result<T> = std::result::Result<T, NorError>;

/// Unified error type for norkv operations
#[derive(Debug, Error)]
pub enum NorError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Device Errors
    // -------------------------------------------------------------------------
    /// The flash device failed a read, write or erase. Not retried.
    #[error("Flash device error: {0}")]
    Device(#[from] FlashError),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    /// Caller supplied a key, value or payload outside its bounds.
    /// Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad magic, bad length or checksum mismatch in a stored record.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Entry not found")]
    NotFound,

    #[error("Log is full ({capacity} records)")]
    StorageFull { capacity: u32 },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
