//! FFT processing for power spectra

use std::sync::Arc;
use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::domain::IqSample;

/// FFT processor for computing windowed power spectra of IQ blocks
pub struct FftProcessor {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    /// (Σw)², normalizes a full-scale tone to its squared amplitude
    window_gain: f32,
}

impl FftProcessor {
    /// Create a new FFT processor with the given size (at least 1)
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(1);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = hann_window(fft_size);
        let sum: f32 = window.iter().sum();

        Self {
            fft,
            fft_size,
            window,
            window_gain: (sum * sum).max(f32::MIN_POSITIVE),
        }
    }

    /// Linear power per bin, fft-shifted so DC sits at bin `fft_size / 2`.
    /// Input shorter than `fft_size` is zero-padded; extra samples are ignored.
    pub fn power_spectrum(&self, samples: &[IqSample]) -> Vec<f32> {
        // Apply window
        let mut buffer: Vec<Complex<f32>> = samples
            .iter()
            .take(self.fft_size)
            .zip(self.window.iter())
            .map(|(&s, &w)| s * w)
            .collect();

        // Pad if necessary
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        // Compute FFT in place
        self.fft.process(&mut buffer);

        // Negative frequencies first, DC in the middle
        buffer.rotate_left((self.fft_size + 1) / 2);

        buffer
            .iter()
            .map(|c| c.norm_sqr() / self.window_gain)
            .collect()
    }

    /// Get the FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Index of the DC bin in shifted output
    pub fn center_bin(&self) -> usize {
        self.fft_size / 2
    }
}

/// Periodic Hann window; a single-sample window is left unweighted
fn hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            let x = std::f32::consts::PI * i as f32 / size as f32;
            0.5 * (1.0 - (2.0 * x).cos())
        })
        .collect()
}
