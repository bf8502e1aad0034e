//! Published artifact layout
//!
//! Every part of a snapshot lives in its own JSON file named
//! `<prefix>_<part>.json` inside the output directory. Writers replace a
//! part in one atomic rename; readers may see parts from different
//! versions and must check paired lengths before trusting them.

pub mod reader;

use std::path::{Path, PathBuf};

pub use reader::{ArtifactReader, LiveArtifacts, SweepArtifacts};

/// Parts written for a sweep role, in write order
pub const SWEEP_PARTS: [&str; 4] = ["frequencies", "noise_floors", "resonances", "metadata"];
/// Parts written for the live role, in write order
pub const LIVE_PARTS: [&str; 4] = ["frequencies", "psd", "waterfall", "metadata"];

/// Artifact prefix a worker role publishes under
pub fn role_prefix(role: &str) -> String {
    role.trim().replace('-', "_")
}

pub fn artifact_path(dir: &Path, prefix: &str, part: &str) -> PathBuf {
    dir.join(format!("{prefix}_{part}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_map_to_underscored_prefixes() {
        assert_eq!(role_prefix("antenna-sweep"), "antenna_sweep");
        assert_eq!(role_prefix("spectrum-sweep"), "spectrum_sweep");
        assert_eq!(role_prefix("live-waterfall"), "live_waterfall");
    }

    #[test]
    fn part_paths_join_prefix_and_part() {
        let path = artifact_path(Path::new("/tmp/out"), "antenna_sweep", "noise_floors");
        assert_eq!(path, PathBuf::from("/tmp/out/antenna_sweep_noise_floors.json"));
    }
}
