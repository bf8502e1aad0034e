//! Sweep controller
//!
//! Walks the frequency ladder with one owned hardware session, estimates
//! the noise floor at every step and republishes the growing series after
//! each step. A transient capture failure skips its step; a transport
//! failure or a stop request ends the run early with the collected points
//! kept. The resonance detector only runs on a sweep that finished.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    now_millis, DetectorConfig, EstimatorConfig, Frequency, HarmonicRelation, ResonanceRecord,
    ScanError, ScanResult, SkippedStep, SpectrumPoint, SweepConfig, SweepSnapshot, SweepStatus,
};
use crate::dsp::SpectralEstimator;
use crate::ports::{Publisher, SdrSession};
use crate::resonance::ResonanceDetector;

/// Reason recorded when a run ends on a stop request
pub const STOPPED_REASON: &str = "stopped";

/// Result of one sweep run
#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub status: SweepStatus,
    pub points: Vec<SpectrumPoint>,
    pub skipped: Vec<SkippedStep>,
    pub resonances: Vec<ResonanceRecord>,
    pub harmonics: Vec<HarmonicRelation>,
    /// Why an aborted run ended early
    pub abort_reason: Option<String>,
    /// Fatal error that ended the run, if any
    pub error: Option<ScanError>,
}

impl SweepOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map_or(0, ScanError::exit_code)
    }
}

pub struct SweepController<P: Publisher> {
    config: SweepConfig,
    detector: ResonanceDetector,
    estimator: SpectralEstimator,
    publisher: P,
    stop: Arc<AtomicBool>,
    status: SweepStatus,
    version: u64,
}

impl<P: Publisher> SweepController<P> {
    /// Validates `config` up front so nothing is opened for a bad ladder
    pub fn new(config: SweepConfig, detector: DetectorConfig, publisher: P) -> ScanResult<Self> {
        config.validate()?;
        let estimator = SpectralEstimator::new(EstimatorConfig {
            segments: config.segments,
            ..Default::default()
        });
        Ok(Self {
            config,
            detector: ResonanceDetector::new(detector),
            estimator,
            publisher,
            stop: Arc::new(AtomicBool::new(false)),
            status: SweepStatus::Idle,
            version: 0,
        })
    }

    /// Share an externally owned stop flag (signal handler, supervisor)
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn status(&self) -> SweepStatus {
        self.status
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Run the whole ladder. Takes the session by value and closes it
    /// before returning, whatever the outcome.
    pub fn run(&mut self, mut session: Box<dyn SdrSession>) -> SweepOutcome {
        let mut outcome = self.sweep(session.as_mut());

        if let Err(e) = session.close() {
            log::warn!("Failed to close session: {e}");
        }
        drop(session);

        self.status = outcome.status;
        let final_publish = self.publish(&outcome);
        if let Err(e) = final_publish {
            log::error!("Final publish failed: {e}");
            if outcome.error.is_none() {
                outcome.error = Some(e);
            }
        }

        log::info!(
            "Sweep {:?}: {} points, {} skipped, {} resonances",
            outcome.status,
            outcome.points.len(),
            outcome.skipped.len(),
            outcome.resonances.len()
        );
        outcome
    }

    fn sweep(&mut self, session: &mut dyn SdrSession) -> SweepOutcome {
        let ladder = self.config.ladder();
        let mut outcome = SweepOutcome {
            status: SweepStatus::Running,
            points: Vec::with_capacity(ladder.len()),
            skipped: Vec::new(),
            resonances: Vec::new(),
            harmonics: Vec::new(),
            abort_reason: None,
            error: None,
        };
        self.status = SweepStatus::Running;

        log::info!(
            "Sweeping {:.3}-{:.3} MHz in {} steps of {:.3} kHz",
            self.config.start_hz / 1e6,
            self.config.end_hz / 1e6,
            ladder.len(),
            self.config.step_hz / 1e3
        );

        for freq in ladder {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("Stop requested, ending sweep at {:.3} MHz", freq / 1e6);
                outcome.status = SweepStatus::Aborted;
                outcome.abort_reason = Some(STOPPED_REASON.to_string());
                return outcome;
            }

            match self.measure(session, freq) {
                Ok(noise_floor_db) => {
                    outcome.points.push(SpectrumPoint {
                        frequency_hz: freq,
                        noise_floor_db,
                    });
                }
                Err(e) if !e.is_fatal() => {
                    log::warn!("Skipping {:.3} MHz: {e}", freq / 1e6);
                    outcome.skipped.push(SkippedStep {
                        frequency_hz: freq,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    log::error!("Aborting sweep at {:.3} MHz: {e}", freq / 1e6);
                    outcome.status = SweepStatus::Aborted;
                    outcome.abort_reason = Some(e.to_string());
                    outcome.error = Some(e);
                    return outcome;
                }
            }

            if let Err(e) = self.publish(&outcome) {
                log::error!("Progressive publish failed: {e}");
                outcome.status = SweepStatus::Aborted;
                outcome.abort_reason = Some(e.to_string());
                outcome.error = Some(e);
                return outcome;
            }
        }

        if outcome.points.is_empty() {
            outcome.status = SweepStatus::Failed;
            outcome.error = Some(ScanError::EmptyResult);
            return outcome;
        }

        let analysis = self.detector.analyze(&outcome.points);
        outcome.resonances = analysis.resonances;
        outcome.harmonics = analysis.harmonics;
        outcome.status = SweepStatus::Completed;
        outcome
    }

    /// Tune, settle, capture and estimate one ladder step
    fn measure(&mut self, session: &mut dyn SdrSession, freq: f64) -> ScanResult<f64> {
        session.tune(Frequency::hz(freq))?;
        if self.config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.config.settle_ms));
        }
        let samples = session.capture(self.config.samples_per_point)?;
        let spectrum = self.estimator.estimate(&samples)?;
        log::debug!(
            "{:.3} MHz: noise floor {:.2} dB",
            freq / 1e6,
            spectrum.noise_floor_db
        );
        Ok(spectrum.noise_floor_db as f64)
    }

    fn publish(&mut self, outcome: &SweepOutcome) -> ScanResult<()> {
        self.version += 1;
        let snapshot = SweepSnapshot {
            version: self.version,
            status: outcome.status,
            start_hz: self.config.start_hz,
            end_hz: self.config.end_hz,
            step_hz: self.config.step_hz,
            points: outcome.points.clone(),
            skipped: outcome.skipped.clone(),
            resonances: outcome.resonances.clone(),
            harmonics: outcome.harmonics.clone(),
            timestamp_ms: now_millis(),
        };
        self.publisher.publish_sweep(&snapshot)
    }
}
