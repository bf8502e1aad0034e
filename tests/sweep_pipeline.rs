//! Integration tests: simulated SDR → sweep controller → file artifacts
//!
//! Every test runs a full worker sweep against the simulated device, writes
//! into a temporary output directory and reads the result back the way a
//! polling consumer would.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use rfscope_lib::adapters::{NoiseProfile, SimulatedSdr, SimulatedSdrConfig};
use rfscope_lib::domain::{ScanError, SweepConfig, SweepStatus, WorkerProfile};
use rfscope_lib::ports::SdrDriver;
use rfscope_lib::publish::ArtifactReader;
use rfscope_lib::worker::{self, ANTENNA_SWEEP};

fn profile(dir: &std::path::Path, start: f64, end: f64, step: f64) -> WorkerProfile {
    WorkerProfile {
        output_dir: dir.to_path_buf(),
        sweep: SweepConfig {
            start_hz: start,
            end_hz: end,
            step_hz: step,
            samples_per_point: 16_384,
            settle_ms: 0,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn no_stop() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn test_single_resonance_is_found_and_published() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::with_profile(NoiseProfile::flat(-40.0).with_bump(98e6, 6.0, 4e6));
    let profile = profile(dir.path(), 88e6, 108e6, 1e6);

    let outcome = worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, no_stop()).unwrap();
    assert_eq!(outcome.status, SweepStatus::Completed);
    assert_eq!(outcome.points.len(), 21);
    assert_eq!(outcome.resonances.len(), 1);
    assert!(!sdr.is_claimed());

    let r = &outcome.resonances[0];
    assert!(
        (r.frequency_hz - 98e6).abs() <= 1e6,
        "resonance at {} Hz",
        r.frequency_hz
    );
    // FWHM of the smoothed series: the 4 MHz bump reads about 5.57 MHz
    assert!(
        (r.bandwidth_hz - 5.566e6).abs() < 0.25e6,
        "bandwidth {}",
        r.bandwidth_hz
    );
    assert!((r.q_factor - r.frequency_hz / r.bandwidth_hz).abs() < 1e-9);

    let reader = ArtifactReader::new(dir.path(), "antenna_sweep").unwrap();
    let view = reader.read_sweep().unwrap().expect("artifacts published");
    assert!(view.metadata.completed);
    assert_eq!(view.metadata.status, SweepStatus::Completed);
    assert_eq!(view.metadata.point_count, 21);
    assert_eq!(view.metadata.resonance_count, 1);
    assert_eq!(view.frequencies.len(), view.noise_floors.len());
    assert_eq!(view.resonances, outcome.resonances);
}

#[test]
fn test_third_harmonic_over_wide_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::with_profile(
        NoiseProfile::flat(-40.0)
            .with_bump(145e6, 6.0, 20e6)
            .with_bump(435e6, 5.0, 20e6),
    );
    let profile = profile(dir.path(), 100e6, 500e6, 5e6);

    let outcome = worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, no_stop()).unwrap();
    let freqs: Vec<f64> = outcome.resonances.iter().map(|r| r.frequency_hz).collect();
    assert_eq!(freqs, vec![145e6, 435e6]);

    let harmonic = &outcome.resonances[1];
    assert!(harmonic.is_harmonic);
    assert_eq!(harmonic.harmonic_number, Some(3));
    assert_eq!(harmonic.fundamental_freq_hz, Some(145e6));
    assert_eq!(outcome.harmonics.len(), 1);
}

#[test]
fn test_absent_device_publishes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::new(SimulatedSdrConfig {
        absent: true,
        ..Default::default()
    });
    let profile = profile(dir.path(), 88e6, 108e6, 1e6);

    let err = worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, no_stop()).unwrap_err();
    assert!(matches!(err, ScanError::HardwareUnavailable(_)));
    assert_eq!(err.exit_code(), 3);

    let reader = ArtifactReader::new(dir.path(), "antenna_sweep").unwrap();
    assert_eq!(reader.read_sweep().unwrap(), None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_busy_device_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::new(SimulatedSdrConfig::default());
    let profile = profile(dir.path(), 88e6, 90e6, 1e6);

    let _held = sdr.open(&profile.sweep.tuner_settings(0)).unwrap();
    let err = worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, no_stop()).unwrap_err();
    assert!(matches!(err, ScanError::HardwareUnavailable(_)));
}

#[test]
fn test_bad_config_never_opens_device() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::new(SimulatedSdrConfig {
        absent: true,
        ..Default::default()
    });
    // An absent device would report HardwareUnavailable if it were opened
    let profile = profile(dir.path(), 108e6, 88e6, 1e6);
    let err = worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, no_stop()).unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_transport_failure_keeps_published_points() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::new(SimulatedSdrConfig {
        fail_after: Some(7),
        ..Default::default()
    });
    let profile = profile(dir.path(), 88e6, 108e6, 1e6);

    let outcome = worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, no_stop()).unwrap();
    assert_eq!(outcome.status, SweepStatus::Aborted);
    assert_eq!(outcome.exit_code(), 4);

    let reader = ArtifactReader::new(dir.path(), "antenna_sweep").unwrap();
    let view = reader.read_sweep().unwrap().unwrap();
    assert_eq!(view.frequencies.len(), 7);
    assert!(!view.metadata.completed);
    assert_eq!(view.metadata.status, SweepStatus::Aborted);
    assert!(view.resonances.is_empty());
}

#[test]
fn test_stop_before_start_aborts_without_points() {
    let dir = tempfile::tempdir().unwrap();
    let sdr = SimulatedSdr::new(SimulatedSdrConfig::default());
    let profile = profile(dir.path(), 88e6, 108e6, 1e6);

    let outcome =
        worker::run_sweep(&profile, ANTENNA_SWEEP, &sdr, Arc::new(AtomicBool::new(true))).unwrap();
    assert_eq!(outcome.status, SweepStatus::Aborted);
    assert!(outcome.points.is_empty());
    assert_eq!(outcome.exit_code(), 0);
    assert!(!sdr.is_claimed());
}
