//! Domain error types

use thiserror::Error;

/// Errors that can occur while acquiring or publishing spectrum data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// Device could not be claimed (busy, absent, permission denied)
    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// Transport failure while the session was open
    #[error("Hardware I/O error: {0}")]
    HardwareIo(String),

    /// A single capture or estimate failed; the sweep may continue
    #[error("Transient capture error: {0}")]
    TransientCapture(String),

    #[error("Sweep produced no usable points")]
    EmptyResult,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("Supervisor error: {0}")]
    Supervisor(String),
}

impl ScanError {
    /// Fatal errors end the worker; only transient capture errors are survivable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::TransientCapture(_))
    }

    /// Process exit status reported to the supervisor
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanError::Config(_) => 2,
            ScanError::HardwareUnavailable(_) => 3,
            ScanError::HardwareIo(_) | ScanError::TransientCapture(_) => 4,
            ScanError::EmptyResult => 5,
            ScanError::Publish(_) => 6,
            ScanError::Supervisor(_) => 7,
        }
    }
}

/// Result type alias for acquisition operations
pub type ScanResult<T> = Result<T, ScanError>;
