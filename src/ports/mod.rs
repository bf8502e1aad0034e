//! Port traits (interfaces)
//!
//! These traits define the boundaries between the acquisition core and
//! external I/O. Adapters implement them to connect to real hardware or
//! to a consumer.

pub mod publish;
pub mod sdr;

pub use publish::*;
pub use sdr::*;
