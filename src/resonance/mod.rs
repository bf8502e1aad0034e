//! Resonance detection on a completed sweep
//!
//! The raw noise-floor series is smoothed, peaks are accepted in frequency
//! order by prominence and minimum separation, each peak gets a half-
//! prominence bandwidth and Q-factor, and finally every pair of accepted
//! peaks is checked for an integer frequency ratio.

pub mod harmonics;
pub mod peaks;

use crate::domain::{
    DetectorConfig, HarmonicMatch, HarmonicRelation, ResonanceRecord, ScanError, ScanResult,
    SpectrumPoint,
};
use crate::dsp::smoothing::moving_average;

pub use harmonics::find_harmonics;

/// Output of one detector run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResonanceAnalysis {
    /// Series the peaks were searched on
    pub smoothed: Vec<f64>,
    /// Ascending frequency
    pub resonances: Vec<ResonanceRecord>,
    pub harmonics: Vec<HarmonicRelation>,
}

pub struct ResonanceDetector {
    config: DetectorConfig,
}

impl ResonanceDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Analyze sweep points, which must be in ascending frequency order
    pub fn analyze(&self, points: &[SpectrumPoint]) -> ResonanceAnalysis {
        let frequencies: Vec<f64> = points.iter().map(|p| p.frequency_hz).collect();
        let values: Vec<f64> = points.iter().map(|p| p.noise_floor_db).collect();
        self.analyze_series(&frequencies, &values)
            .unwrap_or_default()
    }

    /// Analyze paired frequency/level arrays. Empty input yields an empty
    /// analysis; arrays of different length are a configuration error.
    pub fn analyze_series(&self, frequencies: &[f64], values: &[f64]) -> ScanResult<ResonanceAnalysis> {
        if frequencies.len() != values.len() {
            return Err(ScanError::Config(format!(
                "series length mismatch: {} frequencies, {} values",
                frequencies.len(),
                values.len()
            )));
        }
        if frequencies.is_empty() {
            return Ok(ResonanceAnalysis::default());
        }

        let smoothed = moving_average(values, self.config.smoothing_window);
        let accepted = self.accept_peaks(frequencies, &smoothed);

        let mut resonances: Vec<ResonanceRecord> = accepted
            .iter()
            .map(|&(index, prominence)| self.describe(frequencies, &smoothed, index, prominence))
            .collect();

        let peak_freqs: Vec<f64> = resonances.iter().map(|r| r.frequency_hz).collect();
        let harmonics = find_harmonics(&peak_freqs, self.config.harmonic_tolerance);

        for record in &mut resonances {
            record.harmonic_of = harmonics
                .iter()
                .filter(|h| h.harmonic_freq_hz == record.frequency_hz)
                .map(|h| HarmonicMatch {
                    fundamental_freq_hz: h.fundamental_freq_hz,
                    harmonic_number: h.harmonic_number,
                })
                .collect();
            if let Some(first) = record.harmonic_of.first() {
                record.is_harmonic = true;
                record.harmonic_number = Some(first.harmonic_number);
                record.fundamental_freq_hz = Some(first.fundamental_freq_hz);
            }
        }

        log::debug!(
            "Resonance scan: {} points, {} peaks, {} harmonic pairs",
            frequencies.len(),
            resonances.len(),
            harmonics.len()
        );

        Ok(ResonanceAnalysis {
            smoothed,
            resonances,
            harmonics,
        })
    }

    /// Greedy acceptance in frequency order: prominence threshold first, then
    /// distance to every already accepted peak. Distance is counted in ladder
    /// steps of frequency, so skipped points do not bring peaks closer.
    fn accept_peaks(&self, frequencies: &[f64], smoothed: &[f64]) -> Vec<(usize, f64)> {
        let step = ladder_step(frequencies);
        let mut accepted: Vec<(usize, f64)> = Vec::new();
        for index in peaks::local_maxima(smoothed) {
            let prominence = peaks::prominence(smoothed, index);
            if prominence < self.config.prominence_threshold_db {
                continue;
            }
            let clear = accepted.iter().all(|&(other, _)| {
                let steps = match step {
                    Some(step) => ((frequencies[index] - frequencies[other]).abs() / step).round(),
                    None => index.abs_diff(other) as f64,
                };
                steps >= self.config.min_separation_steps as f64
            });
            if clear {
                accepted.push((index, prominence));
            }
        }
        accepted
    }

    fn describe(
        &self,
        frequencies: &[f64],
        smoothed: &[f64],
        index: usize,
        prominence: f64,
    ) -> ResonanceRecord {
        let level = smoothed[index] - prominence / 2.0;
        let (left, right) = peaks::half_level_crossings(frequencies, smoothed, index, level);
        let bandwidth = (right - left).max(0.0);
        let frequency = frequencies[index];
        let q_factor = if bandwidth > 0.0 { frequency / bandwidth } else { 0.0 };

        ResonanceRecord {
            frequency_hz: frequency,
            noise_floor_db: smoothed[index],
            prominence_db: prominence,
            bandwidth_hz: bandwidth,
            q_factor,
            left_freq_hz: left,
            right_freq_hz: right,
            is_harmonic: false,
            harmonic_number: None,
            fundamental_freq_hz: None,
            harmonic_of: Vec::new(),
        }
    }
}

/// Smallest spacing between neighbouring points, taken as the ladder step
fn ladder_step(frequencies: &[f64]) -> Option<f64> {
    frequencies
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .filter(|d| *d > 0.0)
        .min_by(f64::total_cmp)
}

impl Default for ResonanceDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
