//! Worker configuration
//!
//! A `WorkerProfile` is a JSON document holding every tunable of a worker
//! run (sweep ladder, live loop, detector thresholds, output location).
//! Every field has a default so a profile may be partial; CLI flags are
//! applied on top after loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{GainMode, ScanError, ScanResult, TunerSettings};

/// Wide sweeps cover a large span coarsely, targeted sweeps one band densely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    Wide,
    Targeted,
}

/// Typical number of ladder points for a wide sweep
pub const WIDE_SWEEP_POINTS: usize = 25;
/// Typical number of ladder points for a targeted sweep
pub const TARGETED_SWEEP_POINTS: usize = 160;
/// Largest ladder a sweep accepts
pub const MAX_LADDER_POINTS: usize = 100_000;

/// Parameters of one sweep run; immutable once the run starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub kind: SweepKind,
    pub start_hz: f64,
    pub end_hz: f64,
    pub step_hz: f64,
    /// IQ samples captured at each ladder step
    pub samples_per_point: usize,
    pub gain: GainMode,
    pub sample_rate: u32,
    /// Wait after tuning before the capture is trusted
    pub settle_ms: u64,
    /// Welch sub-segments averaged per estimate
    pub segments: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            kind: SweepKind::Wide,
            start_hz: 50_000_000.0,
            end_hz: 1_000_000_000.0,
            step_hz: 39_583_333.0,
            samples_per_point: 16_384,
            gain: GainMode::Auto,
            sample_rate: 2_048_000,
            settle_ms: 30,
            segments: 4,
        }
    }
}

impl SweepConfig {
    /// Coarse sweep of `[start_hz, end_hz]` with about `WIDE_SWEEP_POINTS` steps
    pub fn wide(start_hz: f64, end_hz: f64) -> Self {
        Self {
            kind: SweepKind::Wide,
            start_hz,
            end_hz,
            step_hz: step_for(start_hz, end_hz, WIDE_SWEEP_POINTS),
            ..Default::default()
        }
    }

    /// Dense sweep of `span_hz` around `center_hz`
    pub fn targeted(center_hz: f64, span_hz: f64) -> Self {
        let start_hz = center_hz - span_hz / 2.0;
        let end_hz = center_hz + span_hz / 2.0;
        Self {
            kind: SweepKind::Targeted,
            start_hz,
            end_hz,
            step_hz: step_for(start_hz, end_hz, TARGETED_SWEEP_POINTS),
            samples_per_point: 8_192,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> ScanResult<()> {
        if !self.start_hz.is_finite() || !self.end_hz.is_finite() || !self.step_hz.is_finite() {
            return Err(ScanError::Config("sweep bounds must be finite".into()));
        }
        if self.start_hz <= 0.0 {
            return Err(ScanError::Config("start frequency must be positive".into()));
        }
        if self.end_hz < self.start_hz {
            return Err(ScanError::Config(format!(
                "end frequency {} Hz is below start frequency {} Hz",
                self.end_hz, self.start_hz
            )));
        }
        if self.step_hz <= 0.0 {
            return Err(ScanError::Config("step must be positive".into()));
        }
        let points = self.ladder_len();
        if points > MAX_LADDER_POINTS {
            return Err(ScanError::Config(format!(
                "sweep ladder has {points} points, limit is {MAX_LADDER_POINTS}"
            )));
        }
        if self.samples_per_point == 0 {
            return Err(ScanError::Config("samples per point must be at least 1".into()));
        }
        if self.segments == 0 {
            return Err(ScanError::Config("segment count must be at least 1".into()));
        }
        if self.sample_rate == 0 {
            return Err(ScanError::Config("sample rate must be positive".into()));
        }
        Ok(())
    }

    /// Strictly ascending ladder `start + i * step` for every step that stays
    /// within `end`. `start == end` gives a single point.
    pub fn ladder(&self) -> Vec<f64> {
        (0..self.ladder_len())
            .map(|i| self.start_hz + i as f64 * self.step_hz)
            .collect()
    }

    /// Number of ladder points, without building the ladder
    pub fn ladder_len(&self) -> usize {
        // Tolerance keeps an exact multiple of the step from dropping the last point
        let steps = ((self.end_hz - self.start_hz) / self.step_hz + 1e-9).floor();
        // Saturating float cast; absurd spans land on usize::MAX
        (steps as usize).saturating_add(1)
    }

    pub fn tuner_settings(&self, device_index: u32) -> TunerSettings {
        TunerSettings {
            device_index,
            sample_rate: self.sample_rate,
            gain: self.gain,
            ppm_correction: 0,
        }
    }
}

fn step_for(start_hz: f64, end_hz: f64, points: usize) -> f64 {
    let span = end_hz - start_hz;
    if span <= 0.0 || points < 2 {
        // Any positive step yields a single point for an empty span
        1.0
    } else {
        span / (points - 1) as f64
    }
}

/// Spectral estimator tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Number of sub-segments averaged in the linear power domain
    pub segments: usize,
    /// Floor added before the logarithm
    pub epsilon: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            segments: 4,
            epsilon: 1e-12,
        }
    }
}

/// Resonance detector thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Moving-average window applied before the peak search
    pub smoothing_window: usize,
    pub prominence_threshold_db: f64,
    /// Minimum distance, in ladder steps, between accepted peaks
    pub min_separation_steps: usize,
    /// Relative tolerance for integer frequency ratios
    pub harmonic_tolerance: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            prominence_threshold_db: 2.0,
            min_separation_steps: 10,
            harmonic_tolerance: 0.05,
        }
    }
}

/// DC-spike suppression around the center bin of a live spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcSpikeConfig {
    pub enabled: bool,
    /// Bins replaced on each side of the center bin
    pub half_width: usize,
    /// Bins on each side used for the polynomial fit
    pub fit_span: usize,
    /// Bins on each side cross-faded into the fit
    pub blend_margin: usize,
}

impl Default for DcSpikeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            half_width: 2,
            fit_span: 24,
            blend_margin: 10,
        }
    }
}

/// Live acquisition loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub center_hz: f64,
    pub sample_rate: u32,
    pub gain: GainMode,
    pub fft_size: usize,
    /// Blocks averaged per frame
    pub averages: usize,
    /// Waterfall history capacity
    pub waterfall_rows: usize,
    /// Minimum time between publishes
    pub publish_interval_ms: u64,
    pub dc: DcSpikeConfig,
    pub epsilon: f32,
    /// Stop after this many cycles; unbounded when absent
    pub max_cycles: Option<u64>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            center_hz: 100_000_000.0,
            sample_rate: 2_048_000,
            gain: GainMode::Auto,
            fft_size: 1024,
            averages: 4,
            waterfall_rows: 128,
            publish_interval_ms: 16,
            dc: DcSpikeConfig::default(),
            epsilon: 1e-12,
            max_cycles: None,
        }
    }
}

impl LiveConfig {
    pub fn validate(&self) -> ScanResult<()> {
        if !self.center_hz.is_finite() || self.center_hz <= 0.0 {
            return Err(ScanError::Config("center frequency must be positive".into()));
        }
        if self.fft_size < 8 {
            return Err(ScanError::Config("FFT size must be at least 8".into()));
        }
        if self.averages == 0 {
            return Err(ScanError::Config("average count must be at least 1".into()));
        }
        if self.waterfall_rows == 0 {
            return Err(ScanError::Config("waterfall needs at least one row".into()));
        }
        if self.sample_rate == 0 {
            return Err(ScanError::Config("sample rate must be positive".into()));
        }
        Ok(())
    }

    pub fn tuner_settings(&self, device_index: u32) -> TunerSettings {
        TunerSettings {
            device_index,
            sample_rate: self.sample_rate,
            gain: self.gain,
            ppm_correction: 0,
        }
    }
}

/// Which driver backs the hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Simulated,
    RtlSdr,
}

/// Saved settings for a worker process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerProfile {
    /// Directory the artifacts are published into
    pub output_dir: PathBuf,
    pub device: DeviceKind,
    pub device_index: u32,
    pub sweep: SweepConfig,
    pub live: LiveConfig,
    pub detector: DetectorConfig,
}

impl Default for WorkerProfile {
    fn default() -> Self {
        Self {
            output_dir: std::env::temp_dir().join("rfscope"),
            device: DeviceKind::Simulated,
            device_index: 0,
            sweep: SweepConfig::default(),
            live: LiveConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl WorkerProfile {
    pub fn load(path: &Path) -> ScanResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("Failed to read profile '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            ScanError::Config(format!("Failed to parse profile '{}': {e}", path.display()))
        })
    }
}

/// Validate an artifact prefix so it cannot escape the output directory.
/// Rejects anything with path separators, "..", or characters outside
/// `[A-Za-z0-9_-]`.
pub fn sanitize_prefix(prefix: &str) -> ScanResult<String> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return Err(ScanError::Config("Artifact prefix cannot be empty".to_string()));
    }
    if trimmed.contains("..") || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(ScanError::Config("Invalid artifact prefix".to_string()));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ScanError::Config(
            "Artifact prefix contains invalid characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
