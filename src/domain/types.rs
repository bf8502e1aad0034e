//! Core domain types

use num_complex::Complex;
use serde::{Deserialize, Serialize};

/// Complex baseband sample as delivered by the SDR (I + jQ, range -1.0 to 1.0)
pub type IqSample = Complex<f32>;

/// Frequency in Hz
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Frequency(pub f64);

impl Frequency {
    pub fn hz(hz: f64) -> Self {
        Self(hz)
    }

    pub fn khz(khz: f64) -> Self {
        Self(khz * 1_000.0)
    }

    pub fn mhz(mhz: f64) -> Self {
        Self(mhz * 1_000_000.0)
    }

    pub fn as_hz(&self) -> f64 {
        self.0
    }

    pub fn as_mhz(&self) -> f64 {
        self.0 / 1_000_000.0
    }
}

/// Tuner gain setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GainMode {
    /// Let the tuner's AGC pick the gain
    Auto,
    /// Manual gain in tenths of dB (496 = 49.6 dB)
    Manual(i32),
}

impl Default for GainMode {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::str::FromStr for GainMode {
    type Err = String;

    /// Accepts `auto` or a gain in tenths of dB
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(GainMode::Auto);
        }
        trimmed
            .parse::<i32>()
            .map(GainMode::Manual)
            .map_err(|_| format!("invalid gain '{trimmed}': expected 'auto' or tenths of dB"))
    }
}

/// Settings applied once when a device is opened
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunerSettings {
    /// Device index on the USB bus
    pub device_index: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub gain: GainMode,
    /// Frequency correction in PPM
    pub ppm_correction: i32,
}

impl Default for TunerSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            sample_rate: 2_048_000,
            gain: GainMode::Auto,
            ppm_correction: 0,
        }
    }
}

/// One measured step of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    pub frequency_hz: f64,
    pub noise_floor_db: f64,
}

/// A ladder step that was skipped after a recoverable failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedStep {
    pub frequency_hz: f64,
    pub reason: String,
}

/// Lifecycle of a sweep run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    Idle,
    Running,
    Completed,
    Aborted,
    Failed,
}

impl SweepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SweepStatus::Completed | SweepStatus::Aborted | SweepStatus::Failed
        )
    }
}

/// A peak found in a completed sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceRecord {
    pub frequency_hz: f64,
    /// Smoothed level at the peak
    pub noise_floor_db: f64,
    pub prominence_db: f64,
    /// Full width at half prominence, never negative
    pub bandwidth_hz: f64,
    /// `frequency / bandwidth`, 0 when the bandwidth is 0
    pub q_factor: f64,
    pub left_freq_hz: f64,
    pub right_freq_hz: f64,
    pub is_harmonic: bool,
    /// Harmonic number against the lowest qualifying fundamental
    pub harmonic_number: Option<u32>,
    pub fundamental_freq_hz: Option<f64>,
    /// Every fundamental this peak qualifies against, ascending
    #[serde(default)]
    pub harmonic_of: Vec<HarmonicMatch>,
}

/// One fundamental a peak is a harmonic of
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicMatch {
    pub fundamental_freq_hz: f64,
    pub harmonic_number: u32,
}

/// A qualifying (fundamental, harmonic) pair of accepted peaks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarmonicRelation {
    pub fundamental_freq_hz: f64,
    pub harmonic_freq_hz: f64,
    pub harmonic_number: u32,
    /// Actual `harmonic / fundamental` ratio
    pub ratio: f64,
}

/// One averaged, DC-corrected spectrum from the live loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFrame {
    pub frequencies_hz: Vec<f64>,
    pub psd_db: Vec<f32>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
