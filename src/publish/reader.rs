//! Consumer side of the artifact protocol
//!
//! A reader polls on its own schedule. A part that is missing, half
//! replaced (parse failure) or paired with a part of a different length is
//! not an error, it just means no consistent update is visible yet.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::domain::{
    sanitize_prefix, LiveMetadata, ResonanceRecord, ScanError, ScanResult, SweepMetadata,
};

use super::artifact_path;

/// Consistent view of a sweep's published parts
#[derive(Debug, Clone, PartialEq)]
pub struct SweepArtifacts {
    pub frequencies: Vec<f64>,
    pub noise_floors: Vec<f64>,
    pub resonances: Vec<ResonanceRecord>,
    pub metadata: SweepMetadata,
}

/// Consistent view of the live role's published parts
#[derive(Debug, Clone, PartialEq)]
pub struct LiveArtifacts {
    pub frequencies: Vec<f64>,
    pub psd: Vec<f32>,
    /// Rows newest-first
    pub waterfall: Vec<Vec<f32>>,
    pub metadata: LiveMetadata,
}

pub struct ArtifactReader {
    dir: PathBuf,
    prefix: String,
}

impl ArtifactReader {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> ScanResult<Self> {
        Ok(Self {
            dir: dir.into(),
            prefix: sanitize_prefix(prefix)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Latest sweep parts, or `None` while they are absent or inconsistent
    pub fn read_sweep(&self) -> ScanResult<Option<SweepArtifacts>> {
        let Some(frequencies) = self.read_part::<Vec<f64>>("frequencies")? else {
            return Ok(None);
        };
        let Some(noise_floors) = self.read_part::<Vec<f64>>("noise_floors")? else {
            return Ok(None);
        };
        if frequencies.len() != noise_floors.len() {
            log::debug!(
                "Sweep parts out of step: {} frequencies, {} noise floors",
                frequencies.len(),
                noise_floors.len()
            );
            return Ok(None);
        }
        let Some(resonances) = self.read_part::<Vec<ResonanceRecord>>("resonances")? else {
            return Ok(None);
        };
        let Some(metadata) = self.read_part::<SweepMetadata>("metadata")? else {
            return Ok(None);
        };

        Ok(Some(SweepArtifacts {
            frequencies,
            noise_floors,
            resonances,
            metadata,
        }))
    }

    /// Latest live parts, or `None` while they are absent or inconsistent
    pub fn read_live(&self) -> ScanResult<Option<LiveArtifacts>> {
        let Some(frequencies) = self.read_part::<Vec<f64>>("frequencies")? else {
            return Ok(None);
        };
        let Some(psd) = self.read_part::<Vec<f32>>("psd")? else {
            return Ok(None);
        };
        if frequencies.len() != psd.len() {
            return Ok(None);
        }
        let Some(waterfall) = self.read_part::<Vec<Vec<f32>>>("waterfall")? else {
            return Ok(None);
        };
        if waterfall.iter().any(|row| row.len() != psd.len()) {
            return Ok(None);
        }
        let Some(metadata) = self.read_part::<LiveMetadata>("metadata")? else {
            return Ok(None);
        };

        Ok(Some(LiveArtifacts {
            frequencies,
            psd,
            waterfall,
            metadata,
        }))
    }

    fn read_part<T: DeserializeOwned>(&self, part: &str) -> ScanResult<Option<T>> {
        let path = artifact_path(&self.dir, &self.prefix, part);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ScanError::Publish(format!(
                    "Failed to read '{}': {e}",
                    path.display()
                )))
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::debug!("Skipping unreadable part '{}': {e}", path.display());
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn missing_parts_mean_no_update() {
        let dir = tempfile::tempdir().unwrap();
        let reader = ArtifactReader::new(dir.path(), "antenna_sweep").unwrap();
        assert_eq!(reader.read_sweep().unwrap(), None);
        assert_eq!(reader.read_live().unwrap(), None);
    }

    #[test]
    fn mismatched_pair_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "antenna_sweep_frequencies.json", "[1.0, 2.0, 3.0]");
        write(dir.path(), "antenna_sweep_noise_floors.json", "[-90.0, -91.0]");
        write(dir.path(), "antenna_sweep_resonances.json", "[]");
        let reader = ArtifactReader::new(dir.path(), "antenna_sweep").unwrap();
        assert_eq!(reader.read_sweep().unwrap(), None);
    }

    #[test]
    fn truncated_part_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "live_waterfall_frequencies.json", "[1.0, 2.");
        let reader = ArtifactReader::new(dir.path(), "live_waterfall").unwrap();
        assert_eq!(reader.read_live().unwrap(), None);
    }

    #[test]
    fn prefix_is_sanitized() {
        assert!(ArtifactReader::new("/tmp", "../escape").is_err());
    }
}
