//! Adapters: implementations of the port traits

pub mod channel_publisher;
pub mod fs_publisher;
pub mod rtl_sdr;
pub mod simulated_sdr;

pub use channel_publisher::{ChannelPublisher, Published, SnapshotReceiver};
pub use fs_publisher::FsPublisher;
pub use rtl_sdr::RtlSdrDriver;
pub use simulated_sdr::{Carrier, NoiseProfile, SimulatedSdr, SimulatedSdrConfig};
