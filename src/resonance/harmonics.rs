//! Pairwise harmonic classification of accepted peaks

use crate::domain::HarmonicRelation;

/// Every ordered pair `(f1 < f2)` where `f2 / f1` is within `tolerance`
/// (relative) of an integer greater than one. A peak may appear against
/// several fundamentals; no pair is dropped in favour of another.
///
/// `frequencies` must be ascending. Output is ordered by harmonic, then by
/// fundamental.
pub fn find_harmonics(frequencies: &[f64], tolerance: f64) -> Vec<HarmonicRelation> {
    let mut relations = Vec::new();
    for (j, &f2) in frequencies.iter().enumerate() {
        for &f1 in &frequencies[..j] {
            if f1 <= 0.0 || f2 <= f1 {
                continue;
            }
            let ratio = f2 / f1;
            let nearest = ratio.round();
            if nearest > 1.0 && (ratio - nearest).abs() / ratio <= tolerance {
                relations.push(HarmonicRelation {
                    fundamental_freq_hz: f1,
                    harmonic_freq_hz: f2,
                    harmonic_number: nearest as u32,
                    ratio,
                });
            }
        }
    }
    relations
}
