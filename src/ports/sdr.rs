//! SDR hardware port traits
//!
//! Split into two traits:
//! - `SdrDriver` - claims a physical device and hands out a session
//! - `SdrSession` - the exclusive, owned handle used to tune and capture
//!
//! A session is a capability: whoever holds the box may capture, and moving
//! it transfers that right. The driver refuses a second open of the same
//! device while a session is alive.

use crate::domain::{Frequency, IqSample, ScanResult, TunerSettings};

/// Factory for hardware sessions
pub trait SdrDriver {
    /// Human-readable device name for logs
    fn name(&self) -> String;

    /// Claim the device. Fails with `HardwareUnavailable` when it is busy,
    /// absent, or not accessible.
    fn open(&self, settings: &TunerSettings) -> ScanResult<Box<dyn SdrSession>>;
}

/// An open, exclusively held device.
///
/// Note: no `Send` bound - vendor handles are often tied to the thread that
/// opened them, and workers drive a session from a single thread.
pub trait SdrSession {
    /// Set the center frequency. Callers wait a settle delay before the next
    /// capture is trusted.
    fn tune(&mut self, freq: Frequency) -> ScanResult<()>;

    /// Block until `n` samples have been read. Transport failures are
    /// `HardwareIo`; a recoverable short read is `TransientCapture`.
    fn capture(&mut self, n: usize) -> ScanResult<Vec<IqSample>>;

    /// Release the device. Calling it again is a no-op.
    fn close(&mut self) -> ScanResult<()>;

    fn is_open(&self) -> bool;

    fn sample_rate(&self) -> u32;
}
