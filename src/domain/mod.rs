//! Core domain types
//!
//! Pure types with no I/O dependencies. These represent the sweep, resonance
//! and live-spectrum concepts shared by every other module.

pub mod config;
pub mod error;
pub mod snapshot;
pub mod types;

pub use config::*;
pub use error::*;
pub use snapshot::*;
pub use types::*;
