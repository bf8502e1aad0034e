//! Live acquisition loop
//!
//! Stays tuned to one center frequency and turns the sample stream into an
//! averaged, DC-corrected spectrum per cycle. Every row goes into the
//! waterfall history; snapshots are published no faster than the
//! configured interval. Unlike a sweep, any capture error ends the loop.

pub mod waterfall;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{
    now_millis, Frequency, IqSample, LiveConfig, LiveFrame, LiveSnapshot, ScanResult,
};
use crate::dsp::dc_spike::remove_dc_spike;
use crate::dsp::spectral::{average_power, power_to_db};
use crate::dsp::FftProcessor;
use crate::ports::{Publisher, SdrSession};

pub use waterfall::Waterfall;

/// How a live run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSummary {
    pub cycles: u64,
    pub publishes: u64,
}

pub struct LiveLoop<P: Publisher> {
    config: LiveConfig,
    processor: FftProcessor,
    waterfall: Waterfall,
    frequencies: Vec<f64>,
    publisher: P,
    stop: Arc<AtomicBool>,
    version: u64,
}

impl<P: Publisher> LiveLoop<P> {
    pub fn new(config: LiveConfig, publisher: P) -> ScanResult<Self> {
        config.validate()?;
        let processor = FftProcessor::new(config.fft_size);
        let waterfall = Waterfall::new(config.waterfall_rows)?;
        let frequencies = frequency_axis(config.center_hz, config.sample_rate, config.fft_size);
        Ok(Self {
            config,
            processor,
            waterfall,
            frequencies,
            publisher,
            stop: Arc::new(AtomicBool::new(false)),
            version: 0,
        })
    }

    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn waterfall(&self) -> &Waterfall {
        &self.waterfall
    }

    /// Absolute frequency of every output bin
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Average the blocks in linear power, convert to dB and suppress the
    /// DC spike. Blocks shorter than the FFT size are zero-padded.
    pub fn process_blocks(&self, blocks: &[Vec<IqSample>]) -> Vec<f32> {
        let power = average_power(&self.processor, blocks.iter().map(Vec::as_slice));
        let mut psd = power_to_db(&power, self.config.epsilon);
        remove_dc_spike(&mut psd, self.processor.center_bin(), &self.config.dc);
        psd
    }

    /// Run until stopped, `max_cycles` is reached or an error occurs. The
    /// session is closed on every path.
    pub fn run(&mut self, mut session: Box<dyn SdrSession>) -> ScanResult<LiveSummary> {
        let result = self.cycle_until_done(session.as_mut());
        if let Err(e) = session.close() {
            log::warn!("Failed to close session: {e}");
        }
        match &result {
            Ok(summary) => log::info!(
                "Live loop stopped after {} cycles, {} publishes",
                summary.cycles,
                summary.publishes
            ),
            Err(e) => log::error!("Live loop failed: {e}"),
        }
        result
    }

    fn cycle_until_done(&mut self, session: &mut dyn SdrSession) -> ScanResult<LiveSummary> {
        session.tune(Frequency::hz(self.config.center_hz))?;
        log::info!(
            "Live spectrum at {:.3} MHz, {} bins, {} averages",
            self.config.center_hz / 1e6,
            self.config.fft_size,
            self.config.averages
        );

        let interval = Duration::from_millis(self.config.publish_interval_ms);
        let mut last_publish: Option<Instant> = None;
        let mut summary = LiveSummary {
            cycles: 0,
            publishes: 0,
        };
        let mut pending: Option<LiveFrame> = None;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("Stop requested");
                break;
            }
            if self
                .config
                .max_cycles
                .is_some_and(|max| summary.cycles >= max)
            {
                break;
            }

            let frame = self.cycle(session)?;
            summary.cycles += 1;

            let due = last_publish.map_or(true, |t| t.elapsed() >= interval);
            if due {
                self.publish(&frame, summary.cycles)?;
                summary.publishes += 1;
                last_publish = Some(Instant::now());
                pending = None;
            } else {
                pending = Some(frame);
            }
        }

        // Flush the newest frame so the last visible state is current
        if let Some(frame) = pending {
            self.publish(&frame, summary.cycles)?;
            summary.publishes += 1;
        }
        Ok(summary)
    }

    fn cycle(&mut self, session: &mut dyn SdrSession) -> ScanResult<LiveFrame> {
        let blocks = (0..self.config.averages)
            .map(|_| session.capture(self.config.fft_size))
            .collect::<ScanResult<Vec<_>>>()?;
        let psd_db = self.process_blocks(&blocks);
        self.waterfall.push(psd_db.clone());
        Ok(LiveFrame {
            frequencies_hz: self.frequencies.clone(),
            psd_db,
            timestamp_ms: now_millis(),
        })
    }

    fn publish(&mut self, frame: &LiveFrame, cycle: u64) -> ScanResult<()> {
        self.version += 1;
        let snapshot = LiveSnapshot {
            version: self.version,
            cycle,
            center_hz: self.config.center_hz,
            frequencies_hz: frame.frequencies_hz.clone(),
            psd_db: frame.psd_db.clone(),
            waterfall: self.waterfall.newest_first(),
            timestamp_ms: frame.timestamp_ms,
        };
        self.publisher.publish_live(&snapshot)
    }
}

/// `center + (i - n/2) * fs / n` for each of the `n` shifted bins
pub fn frequency_axis(center_hz: f64, sample_rate: u32, fft_size: usize) -> Vec<f64> {
    let bin_hz = sample_rate as f64 / fft_size as f64;
    let half = (fft_size / 2) as f64;
    (0..fft_size)
        .map(|i| center_hz + (i as f64 - half) * bin_hz)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        Carrier, ChannelPublisher, NoiseProfile, Published, SimulatedSdr, SimulatedSdrConfig,
    };
    use crate::domain::ScanError;
    use crate::dsp::spectral::median;
    use crate::ports::SdrDriver;
    use num_complex::Complex;

    fn config(max_cycles: u64) -> LiveConfig {
        LiveConfig {
            center_hz: 100e6,
            max_cycles: Some(max_cycles),
            publish_interval_ms: 0,
            ..Default::default()
        }
    }

    fn live_snapshots(rx: &crossbeam_channel::Receiver<Published>) -> Vec<LiveSnapshot> {
        rx.try_iter()
            .filter_map(|p| match p {
                Published::Live(s) => Some(s),
                Published::Sweep(_) => None,
            })
            .collect()
    }

    #[test]
    fn axis_is_centered_on_tuned_frequency() {
        let axis = frequency_axis(100e6, 2_048_000, 1024);
        assert_eq!(axis.len(), 1024);
        assert_eq!(axis[512], 100e6);
        assert_eq!(axis[0], 100e6 - 1_024_000.0);
        assert_eq!(axis[513] - axis[512], 2000.0);
    }

    #[test]
    fn carrier_lands_on_its_bin() {
        let sdr = SimulatedSdr::new(SimulatedSdrConfig {
            profile: NoiseProfile::flat(-60.0),
            carriers: vec![Carrier {
                freq_hz: 100e6 + 256e3,
                amplitude: 0.5,
            }],
            ..Default::default()
        });
        let cfg = config(1);
        let session = sdr.open(&cfg.tuner_settings(0)).unwrap();
        let (publisher, rx) = ChannelPublisher::pair();
        let mut live = LiveLoop::new(cfg, publisher).unwrap();
        live.run(session).unwrap();

        let snap = live_snapshots(&rx).pop().unwrap();
        let peak = snap
            .psd_db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 640);
        assert_eq!(snap.frequencies_hz[peak], 100e6 + 256e3);
    }

    #[test]
    fn dc_offset_is_suppressed() {
        let sdr = SimulatedSdr::new(SimulatedSdrConfig {
            profile: NoiseProfile::flat(-40.0),
            dc_offset: Complex::new(0.3, 0.3),
            ..Default::default()
        });
        let cfg = config(2);
        let session = sdr.open(&cfg.tuner_settings(0)).unwrap();
        let (publisher, rx) = ChannelPublisher::pair();
        let mut live = LiveLoop::new(cfg, publisher).unwrap();
        live.run(session).unwrap();

        let snap = live_snapshots(&rx).pop().unwrap();
        let floor = median(&snap.psd_db);
        assert!(
            (snap.psd_db[512] - floor).abs() < 6.0,
            "center {} vs floor {floor}",
            snap.psd_db[512]
        );
    }

    #[test]
    fn bounded_run_publishes_every_cycle_without_interval() {
        let sdr = SimulatedSdr::new(SimulatedSdrConfig::default());
        let cfg = LiveConfig {
            waterfall_rows: 3,
            ..config(5)
        };
        let session = sdr.open(&cfg.tuner_settings(0)).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let publisher = ChannelPublisher::new(tx);
        let mut live = LiveLoop::new(cfg, publisher).unwrap();
        let summary = live.run(session).unwrap();

        assert_eq!(summary, LiveSummary { cycles: 5, publishes: 5 });
        let snaps = live_snapshots(&rx);
        assert_eq!(snaps.len(), 5);
        let rows: Vec<usize> = snaps.iter().map(|s| s.waterfall.len()).collect();
        assert_eq!(rows, vec![1, 2, 3, 3, 3]);
        for snap in &snaps {
            assert_eq!(snap.psd_db.len(), snap.frequencies_hz.len());
            assert_eq!(snap.waterfall[0], snap.psd_db);
        }
        assert!(!sdr.is_claimed());
    }

    #[test]
    fn publish_interval_limits_rate() {
        let sdr = SimulatedSdr::new(SimulatedSdrConfig::default());
        let cfg = LiveConfig {
            publish_interval_ms: 3_600_000,
            ..config(5)
        };
        let session = sdr.open(&cfg.tuner_settings(0)).unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let publisher = ChannelPublisher::new(tx);
        let mut live = LiveLoop::new(cfg, publisher).unwrap();
        let summary = live.run(session).unwrap();

        // First cycle plus the flush of the last one
        assert_eq!(summary.publishes, 2);
        let snaps = live_snapshots(&rx);
        assert_eq!(snaps[1].cycle, 5);
        assert_eq!(snaps[1].waterfall.len(), 5);
    }

    #[test]
    fn capture_error_is_fatal_and_closes_session() {
        let sdr = SimulatedSdr::new(SimulatedSdrConfig {
            transient_failures: [6].into_iter().collect(),
            ..Default::default()
        });
        let cfg = config(10);
        let session = sdr.open(&cfg.tuner_settings(0)).unwrap();
        let (publisher, _rx) = ChannelPublisher::pair();
        let mut live = LiveLoop::new(cfg, publisher).unwrap();
        let result = live.run(session);
        assert!(matches!(result, Err(ScanError::TransientCapture(_))));
        assert!(!sdr.is_claimed());
        // Four captures per cycle: the failure hits the second cycle
        assert_eq!(live.waterfall().len(), 1);
    }

    #[test]
    fn stop_flag_set_before_run_does_nothing() {
        let sdr = SimulatedSdr::new(SimulatedSdrConfig::default());
        let cfg = config(10);
        let session = sdr.open(&cfg.tuner_settings(0)).unwrap();
        let (publisher, rx) = ChannelPublisher::pair();
        let mut live = LiveLoop::new(cfg, publisher).unwrap();
        live.stop_flag().store(true, Ordering::SeqCst);
        let summary = live.run(session).unwrap();
        assert_eq!(summary.cycles, 0);
        assert!(live_snapshots(&rx).is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let (publisher, _rx) = ChannelPublisher::pair();
        let cfg = LiveConfig {
            waterfall_rows: 0,
            ..Default::default()
        };
        assert!(matches!(LiveLoop::new(cfg, publisher), Err(ScanError::Config(_))));
    }
}
