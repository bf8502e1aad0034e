//! Immutable published state
//!
//! Workers never share mutable scan state with consumers. Each publish hands
//! over one complete snapshot tagged with a version that increases by one per
//! publish within a run.

use serde::{Deserialize, Serialize};

use super::{HarmonicRelation, ResonanceRecord, SkippedStep, SpectrumPoint, SweepStatus};

/// Accumulated state of a sweep at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSnapshot {
    pub version: u64,
    pub status: SweepStatus,
    pub start_hz: f64,
    pub end_hz: f64,
    pub step_hz: f64,
    pub points: Vec<SpectrumPoint>,
    pub skipped: Vec<SkippedStep>,
    /// Empty until the sweep completes
    pub resonances: Vec<ResonanceRecord>,
    pub harmonics: Vec<HarmonicRelation>,
    pub timestamp_ms: u64,
}

impl SweepSnapshot {
    pub fn completed(&self) -> bool {
        self.status == SweepStatus::Completed
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.frequency_hz).collect()
    }

    pub fn noise_floors(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.noise_floor_db).collect()
    }

    pub fn metadata(&self) -> SweepMetadata {
        SweepMetadata {
            version: self.version,
            status: self.status,
            completed: self.completed(),
            point_count: self.points.len(),
            resonance_count: self.resonances.len(),
            start_hz: self.start_hz,
            end_hz: self.end_hz,
            step_hz: self.step_hz,
            skipped: self.skipped.clone(),
            timestamp_ms: self.timestamp_ms,
        }
    }
}

/// Small summary record published next to the sweep series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepMetadata {
    pub version: u64,
    pub status: SweepStatus,
    pub completed: bool,
    pub point_count: usize,
    pub resonance_count: usize,
    pub start_hz: f64,
    pub end_hz: f64,
    pub step_hz: f64,
    pub skipped: Vec<SkippedStep>,
    pub timestamp_ms: u64,
}

/// Latest live spectrum plus the waterfall history behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub version: u64,
    pub cycle: u64,
    pub center_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub psd_db: Vec<f32>,
    /// Rows newest-first
    pub waterfall: Vec<Vec<f32>>,
    pub timestamp_ms: u64,
}

impl LiveSnapshot {
    pub fn metadata(&self) -> LiveMetadata {
        LiveMetadata {
            version: self.version,
            cycle: self.cycle,
            center_hz: self.center_hz,
            bins: self.psd_db.len(),
            rows: self.waterfall.len(),
            timestamp_ms: self.timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveMetadata {
    pub version: u64,
    pub cycle: u64,
    pub center_hz: f64,
    pub bins: usize,
    pub rows: usize,
    pub timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(status: SweepStatus) -> SweepSnapshot {
        SweepSnapshot {
            version: 3,
            status,
            start_hz: 88e6,
            end_hz: 108e6,
            step_hz: 1e6,
            points: vec![
                SpectrumPoint { frequency_hz: 88e6, noise_floor_db: -90.0 },
                SpectrumPoint { frequency_hz: 89e6, noise_floor_db: -89.5 },
            ],
            skipped: vec![SkippedStep { frequency_hz: 90e6, reason: "short read".into() }],
            resonances: Vec::new(),
            harmonics: Vec::new(),
            timestamp_ms: 0,
        }
    }

    #[test]
    fn paired_series_have_equal_length() {
        let snap = snapshot(SweepStatus::Running);
        assert_eq!(snap.frequencies().len(), snap.noise_floors().len());
        assert_eq!(snap.frequencies(), vec![88e6, 89e6]);
    }

    #[test]
    fn metadata_reports_counts_and_completion() {
        let running = snapshot(SweepStatus::Running).metadata();
        assert!(!running.completed);
        assert_eq!(running.point_count, 2);
        assert_eq!(running.resonance_count, 0);
        assert_eq!(running.skipped.len(), 1);

        let done = snapshot(SweepStatus::Completed).metadata();
        assert!(done.completed);
        assert_eq!(done.start_hz, 88e6);
        assert_eq!(done.end_hz, 108e6);
    }
}
