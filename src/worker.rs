//! Worker runs: wire a driver, a publisher and a stop flag to one acquisition
//!
//! The order matters: configuration is validated and the output location is
//! prepared before the device is claimed, so a bad invocation never touches
//! hardware, and an unavailable device publishes nothing.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::adapters::{FsPublisher, RtlSdrDriver, SimulatedSdr, SimulatedSdrConfig};
use crate::domain::{sanitize_prefix, DeviceKind, ScanResult, WorkerProfile};
use crate::live::{LiveLoop, LiveSummary};
use crate::ports::SdrDriver;
use crate::publish::role_prefix;
use crate::sweep::{SweepController, SweepOutcome};

pub const ANTENNA_SWEEP: &str = "antenna-sweep";
pub const SPECTRUM_SWEEP: &str = "spectrum-sweep";
pub const LIVE_WATERFALL: &str = "live-waterfall";

/// Driver selected by the profile
pub fn driver_for(device: DeviceKind) -> Box<dyn SdrDriver> {
    match device {
        DeviceKind::Simulated => Box::new(SimulatedSdr::new(SimulatedSdrConfig::demo())),
        DeviceKind::RtlSdr => Box::new(RtlSdrDriver::new()),
    }
}

fn publisher_for(output_dir: &Path, role: &str) -> ScanResult<FsPublisher> {
    let prefix = sanitize_prefix(&role_prefix(role))?;
    FsPublisher::new(output_dir, &prefix)
}

/// Run one sweep for `role` and publish under its prefix
pub fn run_sweep(
    profile: &WorkerProfile,
    role: &str,
    driver: &dyn SdrDriver,
    stop: Arc<AtomicBool>,
) -> ScanResult<SweepOutcome> {
    let publisher = publisher_for(&profile.output_dir, role)?;
    let mut controller = SweepController::new(profile.sweep.clone(), profile.detector, publisher)?
        .with_stop_flag(stop);

    log::info!("{role}: opening {}", driver.name());
    let session = driver.open(&profile.sweep.tuner_settings(profile.device_index))?;
    Ok(controller.run(session))
}

/// Run the live loop until stopped and publish under the live prefix
pub fn run_live(
    profile: &WorkerProfile,
    driver: &dyn SdrDriver,
    stop: Arc<AtomicBool>,
) -> ScanResult<LiveSummary> {
    let publisher = publisher_for(&profile.output_dir, LIVE_WATERFALL)?;
    let mut live = LiveLoop::new(profile.live.clone(), publisher)?.with_stop_flag(stop);

    log::info!("{LIVE_WATERFALL}: opening {}", driver.name());
    let session = driver.open(&profile.live.tuner_settings(profile.device_index))?;
    live.run(session)
}
