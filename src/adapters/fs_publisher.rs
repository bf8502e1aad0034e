//! File-system publisher
//!
//! Each part is serialized to a temporary file in the output directory and
//! renamed over `<prefix>_<part>.json`. Rename within one directory is
//! atomic, so a polling reader sees either the old or the new part, never
//! a partial write. Parts are replaced one after another; metadata goes
//! last.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::{sanitize_prefix, LiveSnapshot, ScanError, ScanResult, SweepSnapshot};
use crate::ports::Publisher;
use crate::publish::artifact_path;

pub struct FsPublisher {
    dir: PathBuf,
    prefix: String,
}

impl FsPublisher {
    /// Publisher writing into `dir`, created if needed
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> ScanResult<Self> {
        let dir = dir.into();
        let prefix = sanitize_prefix(prefix)?;
        std::fs::create_dir_all(&dir).map_err(|e| {
            ScanError::Publish(format!(
                "Failed to create output dir '{}': {e}",
                dir.display()
            ))
        })?;
        Ok(Self { dir, prefix })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn part_path(&self, part: &str) -> PathBuf {
        artifact_path(&self.dir, &self.prefix, part)
    }

    fn write_part<T: Serialize + ?Sized>(&self, part: &str, value: &T) -> ScanResult<()> {
        let json = serde_json::to_vec(value)
            .map_err(|e| ScanError::Publish(format!("Serialization error for {part}: {e}")))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| ScanError::Publish(format!("Failed to create temp file: {e}")))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.flush())
            .map_err(|e| ScanError::Publish(format!("Failed to write {part}: {e}")))?;

        let target = self.part_path(part);
        tmp.persist(&target).map_err(|e| {
            ScanError::Publish(format!(
                "Failed to replace '{}': {}",
                target.display(),
                e.error
            ))
        })?;
        Ok(())
    }
}

impl Publisher for FsPublisher {
    fn publish_sweep(&mut self, snapshot: &SweepSnapshot) -> ScanResult<()> {
        self.write_part("frequencies", &snapshot.frequencies())?;
        self.write_part("noise_floors", &snapshot.noise_floors())?;
        self.write_part("resonances", &snapshot.resonances)?;
        self.write_part("metadata", &snapshot.metadata())?;
        log::trace!(
            "Published {} v{} ({} points)",
            self.prefix,
            snapshot.version,
            snapshot.points.len()
        );
        Ok(())
    }

    fn publish_live(&mut self, snapshot: &LiveSnapshot) -> ScanResult<()> {
        self.write_part("frequencies", &snapshot.frequencies_hz)?;
        self.write_part("psd", &snapshot.psd_db)?;
        self.write_part("waterfall", &snapshot.waterfall)?;
        self.write_part("metadata", &snapshot.metadata())?;
        log::trace!(
            "Published {} v{} ({} rows)",
            self.prefix,
            snapshot.version,
            snapshot.waterfall.len()
        );
        Ok(())
    }
}
