//! Spectral estimator
//!
//! Turns a block of IQ samples into a dB power curve and a noise-floor
//! scalar. The block is split into sub-segments whose windowed power
//! spectra are averaged in the linear domain (Welch); only the average is
//! converted to dB. The noise floor is the median bin, which a strong
//! narrowband carrier cannot drag upward the way it drags a mean.

use crate::domain::{EstimatorConfig, IqSample, ScanError, ScanResult};

use super::fft::FftProcessor;

/// Result of one estimate
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    /// Power per bin in dB, DC at the center bin
    pub psd_db: Vec<f32>,
    pub noise_floor_db: f32,
}

/// Estimate the PSD and noise floor of `samples`.
///
/// Pure: identical input and configuration give an identical result.
pub fn estimate(samples: &[IqSample], config: &EstimatorConfig) -> ScanResult<PowerSpectrum> {
    let (segment_len, _) = segment_layout(samples.len(), config.segments)?;
    SpectralEstimator::new(*config).estimate_with(&FftProcessor::new(segment_len), samples)
}

/// Estimator that keeps the FFT plan for the last segment length it saw.
/// Plan reuse does not change results, only the cost of repeated calls.
pub struct SpectralEstimator {
    config: EstimatorConfig,
    processor: Option<FftProcessor>,
}

impl SpectralEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            processor: None,
        }
    }

    pub fn estimate(&mut self, samples: &[IqSample]) -> ScanResult<PowerSpectrum> {
        let (segment_len, _) = segment_layout(samples.len(), self.config.segments)?;
        let processor = match self.processor.take() {
            Some(p) if p.fft_size() == segment_len => p,
            _ => FftProcessor::new(segment_len),
        };
        let result = self.estimate_with(&processor, samples);
        self.processor = Some(processor);
        result
    }

    fn estimate_with(
        &self,
        processor: &FftProcessor,
        samples: &[IqSample],
    ) -> ScanResult<PowerSpectrum> {
        let (segment_len, segments) = segment_layout(samples.len(), self.config.segments)?;
        let power = average_power(
            processor,
            samples.chunks_exact(segment_len).take(segments),
        );
        let psd_db = power_to_db(&power, self.config.epsilon);
        let noise_floor_db = median(&psd_db);

        if !noise_floor_db.is_finite() {
            return Err(ScanError::TransientCapture(format!(
                "non-finite noise floor ({noise_floor_db})"
            )));
        }

        Ok(PowerSpectrum {
            psd_db,
            noise_floor_db,
        })
    }
}

/// Segment length and count for a block of `len` samples split `requested` ways.
/// Segments keep at least two samples when the block allows; leftover
/// samples are dropped.
fn segment_layout(len: usize, requested: usize) -> ScanResult<(usize, usize)> {
    if len == 0 {
        return Err(ScanError::TransientCapture("empty sample block".into()));
    }
    let segments = requested.min(len / 2).max(1);
    Ok((len / segments, segments))
}

/// Mean linear power of several equally sized blocks
pub fn average_power<'a, I>(processor: &FftProcessor, blocks: I) -> Vec<f32>
where
    I: IntoIterator<Item = &'a [IqSample]>,
{
    let mut acc = vec![0.0f32; processor.fft_size()];
    let mut count = 0usize;
    for block in blocks {
        for (sum, p) in acc.iter_mut().zip(processor.power_spectrum(block)) {
            *sum += p;
        }
        count += 1;
    }
    if count > 1 {
        let k = count as f32;
        acc.iter_mut().for_each(|p| *p /= k);
    }
    acc
}

/// `10·log10(p + ε)` per bin
pub fn power_to_db(power: &[f32], epsilon: f32) -> Vec<f32> {
    power.iter().map(|&p| 10.0 * (p + epsilon).log10()).collect()
}

/// Median of a slice (non-destructive; clones internally). 0 for empty input.
pub fn median(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_block(n: usize, amplitude: f32) -> Vec<IqSample> {
        let mut rng = StdRng::seed_from_u64(7);
        (0..n)
            .map(|_| {
                Complex::new(
                    rng.random_range(-0.5f32..0.5) * amplitude,
                    rng.random_range(-0.5f32..0.5) * amplitude,
                )
            })
            .collect()
    }

    #[test]
    fn all_zero_block_hits_epsilon_floor() {
        let config = EstimatorConfig::default();
        let zeros = vec![Complex::new(0.0f32, 0.0); 4096];
        let result = estimate(&zeros, &config).unwrap();

        let floor = 10.0 * config.epsilon.log10();
        assert!(result.psd_db.iter().all(|&db| db == floor));
        assert_eq!(result.noise_floor_db, floor);
        assert!((floor + 120.0).abs() < 1e-3);
    }

    #[test]
    fn repeated_estimates_are_identical() {
        let config = EstimatorConfig::default();
        let block = noise_block(8192, 0.1);
        let first = estimate(&block, &config).unwrap();
        let second = estimate(&block, &config).unwrap();
        assert_eq!(first, second);

        let mut cached = SpectralEstimator::new(config);
        assert_eq!(cached.estimate(&block).unwrap(), first);
        assert_eq!(cached.estimate(&block).unwrap(), first);
    }

    #[test]
    fn segments_set_the_bin_count() {
        let block = noise_block(4096, 0.1);
        let one = estimate(&block, &EstimatorConfig { segments: 1, ..Default::default() }).unwrap();
        let four = estimate(&block, &EstimatorConfig { segments: 4, ..Default::default() }).unwrap();
        assert_eq!(one.psd_db.len(), 4096);
        assert_eq!(four.psd_db.len(), 1024);
    }

    #[test]
    fn louder_noise_raises_the_floor() {
        let config = EstimatorConfig::default();
        let quiet = estimate(&noise_block(4096, 0.01), &config).unwrap();
        let loud = estimate(&noise_block(4096, 0.1), &config).unwrap();
        // 20 dB more amplitude
        assert!((loud.noise_floor_db - quiet.noise_floor_db - 20.0).abs() < 0.5);
    }

    #[test]
    fn strong_carrier_barely_moves_median_floor() {
        let config = EstimatorConfig::default();
        let noise = noise_block(4096, 0.01);
        let baseline = estimate(&noise, &config).unwrap();

        let with_carrier: Vec<IqSample> = noise
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let phase = 2.0 * std::f32::consts::PI * 0.1 * i as f32;
                s + Complex::new(phase.cos(), phase.sin())
            })
            .collect();
        let carrier = estimate(&with_carrier, &config).unwrap();

        assert!((carrier.noise_floor_db - baseline.noise_floor_db).abs() < 1.0);
        let peak = carrier.psd_db.iter().cloned().fold(f32::MIN, f32::max);
        assert!(peak > carrier.noise_floor_db + 30.0);
    }

    #[test]
    fn linear_averaging_differs_from_db_averaging() {
        let processor = FftProcessor::new(8);
        let loud = vec![Complex::new(1.0f32, 0.0); 8];
        let quiet = vec![Complex::new(0.0f32, 0.0); 8];
        let avg = average_power(&processor, [loud.as_slice(), quiet.as_slice()]);
        let center = processor.center_bin();
        let single = processor.power_spectrum(&loud)[center];
        // Half the linear power is -3 dB, not the midpoint of the two dB values
        assert!((avg[center] - single / 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_block_is_transient() {
        let result = estimate(&[], &EstimatorConfig::default());
        assert!(matches!(result, Err(ScanError::TransientCapture(_))));
    }

    #[test]
    fn tiny_blocks_still_estimate() {
        let config = EstimatorConfig::default();
        let result = estimate(&[Complex::new(0.1, 0.1)], &config).unwrap();
        assert_eq!(result.psd_db.len(), 1);
        let result = estimate(&noise_block(3, 0.1), &config).unwrap();
        assert_eq!(result.psd_db.len(), 3);
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn median_orders_nan_after_numbers() {
        assert_eq!(median(&[f32::NAN, 1.0, 3.0, 2.0, 5.0]), 3.0);
    }
}
