//! Simulated SDR for development and testing without hardware.
//!
//! Select it with `--device simulated` (the default):
//!
//!   RUST_LOG=rfscope_lib=debug rfscope sweep --role antenna-sweep ...
//!
//! The simulated device produces complex Gaussian noise whose level follows a
//! `NoiseProfile` over tuned frequency, so an antenna resonance shows up as a
//! raised noise floor in a sweep. Carriers and a DC offset can be added for
//! live-spectrum work, and captures can be made to fail on purpose.
//! Levels are relative: the estimator's absolute dB depends on FFT size.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use num_complex::Complex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::domain::{Frequency, IqSample, ScanError, ScanResult, TunerSettings};
use crate::ports::{SdrDriver, SdrSession};

/// Gaussian rise of the noise floor around `center_hz`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBump {
    pub center_hz: f64,
    pub height_db: f64,
    pub fwhm_hz: f64,
}

/// Noise floor as a function of tuned frequency
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseProfile {
    pub baseline_db: f64,
    pub bumps: Vec<NoiseBump>,
}

impl NoiseProfile {
    pub fn flat(baseline_db: f64) -> Self {
        Self {
            baseline_db,
            bumps: Vec::new(),
        }
    }

    pub fn with_bump(mut self, center_hz: f64, height_db: f64, fwhm_hz: f64) -> Self {
        self.bumps.push(NoiseBump {
            center_hz,
            height_db,
            fwhm_hz,
        });
        self
    }

    /// Noise level in dB at `freq_hz`
    pub fn level_db(&self, freq_hz: f64) -> f64 {
        self.bumps.iter().fold(self.baseline_db, |acc, bump| {
            if bump.fwhm_hz <= 0.0 {
                return acc;
            }
            let sigma = bump.fwhm_hz / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
            let d = freq_hz - bump.center_hz;
            acc + bump.height_db * (-d * d / (2.0 * sigma * sigma)).exp()
        })
    }
}

impl Default for NoiseProfile {
    fn default() -> Self {
        Self::flat(-40.0)
    }
}

/// Continuous-wave signal at an absolute frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Carrier {
    pub freq_hz: f64,
    /// Amplitude relative to full scale
    pub amplitude: f32,
}

/// Everything the simulated device does, fixed when the driver is built
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSdrConfig {
    pub profile: NoiseProfile,
    pub carriers: Vec<Carrier>,
    /// Constant I/Q offset, shows up as a spike in the center bin
    pub dc_offset: Complex<f32>,
    pub seed: u64,
    /// Zero-based capture calls that fail with `TransientCapture`
    pub transient_failures: BTreeSet<usize>,
    /// Captures from this call index on fail with `HardwareIo`
    pub fail_after: Option<usize>,
    /// Device is not plugged in
    pub absent: bool,
    /// Block for the real duration of each capture
    pub realtime: bool,
}

impl Default for SimulatedSdrConfig {
    fn default() -> Self {
        Self {
            profile: NoiseProfile::default(),
            carriers: Vec::new(),
            dc_offset: Complex::new(0.0, 0.0),
            seed: 0x5eed,
            transient_failures: BTreeSet::new(),
            fail_after: None,
            absent: false,
            realtime: false,
        }
    }
}

impl SimulatedSdrConfig {
    /// Scene used by the worker binary: a 2 m antenna with a third-harmonic
    /// response in the 70 cm band, one FM carrier and a small DC offset.
    /// Captures block for their real duration.
    pub fn demo() -> Self {
        Self {
            profile: NoiseProfile::flat(-40.0)
                .with_bump(145e6, 6.0, 20e6)
                .with_bump(435e6, 5.0, 30e6),
            carriers: vec![Carrier {
                freq_hz: 100.3e6,
                amplitude: 0.05,
            }],
            dc_offset: Complex::new(0.02, -0.01),
            realtime: true,
            ..Default::default()
        }
    }
}

/// Driver for one simulated physical device. Clones refer to the same
/// device and share its claim.
#[derive(Debug, Clone)]
pub struct SimulatedSdr {
    config: Arc<SimulatedSdrConfig>,
    claimed: Arc<AtomicBool>,
}

impl SimulatedSdr {
    pub fn new(config: SimulatedSdrConfig) -> Self {
        Self {
            config: Arc::new(config),
            claimed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_profile(profile: NoiseProfile) -> Self {
        Self::new(SimulatedSdrConfig {
            profile,
            ..Default::default()
        })
    }

    /// Whether a session currently holds the device
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }
}

impl SdrDriver for SimulatedSdr {
    fn name(&self) -> String {
        "simulated SDR".to_string()
    }

    fn open(&self, settings: &TunerSettings) -> ScanResult<Box<dyn SdrSession>> {
        if self.config.absent {
            return Err(ScanError::HardwareUnavailable(format!(
                "no device at index {}",
                settings.device_index
            )));
        }
        if settings.sample_rate == 0 {
            return Err(ScanError::Config("sample rate must be positive".into()));
        }
        if self
            .claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ScanError::HardwareUnavailable(format!(
                "device {} is busy",
                settings.device_index
            )));
        }

        log::info!(
            "[SIM SDR] Opened device {} at {:.3} MS/s, gain {:?}",
            settings.device_index,
            settings.sample_rate as f64 / 1e6,
            settings.gain
        );

        Ok(Box::new(SimulatedSession {
            config: Arc::clone(&self.config),
            claimed: Arc::clone(&self.claimed),
            rng: StdRng::seed_from_u64(self.config.seed),
            sample_rate: settings.sample_rate,
            center_hz: None,
            captures: 0,
            sample_clock: 0,
            open: true,
        }))
    }
}

pub struct SimulatedSession {
    config: Arc<SimulatedSdrConfig>,
    claimed: Arc<AtomicBool>,
    rng: StdRng,
    sample_rate: u32,
    center_hz: Option<f64>,
    captures: usize,
    /// Running sample index, keeps carrier phase continuous across captures
    sample_clock: u64,
    open: bool,
}

impl SimulatedSession {
    fn ensure_open(&self) -> ScanResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(ScanError::HardwareIo("session is closed".into()))
        }
    }
}

impl SdrSession for SimulatedSession {
    fn tune(&mut self, freq: Frequency) -> ScanResult<()> {
        self.ensure_open()?;
        if !(freq.as_hz() > 0.0) {
            return Err(ScanError::HardwareIo(format!(
                "cannot tune to {} Hz",
                freq.as_hz()
            )));
        }
        log::debug!("[SIM SDR] Tune {:.3} MHz", freq.as_mhz());
        self.center_hz = Some(freq.as_hz());
        Ok(())
    }

    fn capture(&mut self, n: usize) -> ScanResult<Vec<IqSample>> {
        self.ensure_open()?;
        let index = self.captures;
        self.captures += 1;

        if let Some(limit) = self.config.fail_after {
            if index >= limit {
                return Err(ScanError::HardwareIo(format!(
                    "USB transfer failed on capture {index}"
                )));
            }
        }
        if self.config.transient_failures.contains(&index) {
            return Err(ScanError::TransientCapture(format!(
                "short read on capture {index}"
            )));
        }

        let center = self
            .center_hz
            .ok_or_else(|| ScanError::TransientCapture("capture before tune".into()))?;

        let sigma = 10f64.powf(self.config.profile.level_db(center) / 20.0) as f32;
        let normal = Normal::new(0.0f32, sigma)
            .map_err(|e| ScanError::TransientCapture(format!("noise model: {e}")))?;

        let fs = self.sample_rate as f64;
        let offsets: Vec<(f64, f32)> = self
            .config
            .carriers
            .iter()
            .map(|c| (c.freq_hz - center, c.amplitude))
            .filter(|(offset, _)| offset.abs() < fs / 2.0)
            .collect();

        let start = self.sample_clock;
        let samples = (0..n)
            .map(|i| {
                let t = (start + i as u64) as f64 / fs;
                let mut s = Complex::new(normal.sample(&mut self.rng), normal.sample(&mut self.rng))
                    + self.config.dc_offset;
                for &(offset, amplitude) in &offsets {
                    let phase = (2.0 * std::f64::consts::PI * offset * t) as f32;
                    s += Complex::new(phase.cos(), phase.sin()) * amplitude;
                }
                s
            })
            .collect();
        self.sample_clock += n as u64;

        if self.config.realtime {
            std::thread::sleep(Duration::from_secs_f64(n as f64 / fs));
        }

        Ok(samples)
    }

    fn close(&mut self) -> ScanResult<()> {
        if self.open {
            self.open = false;
            self.claimed.store(false, Ordering::SeqCst);
            log::info!("[SIM SDR] Closed after {} captures", self.captures);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
