//! Digital Signal Processing
//!
//! Pure functions for signal processing. No I/O dependencies.

pub mod dc_spike;
pub mod fft;
pub mod smoothing;
pub mod spectral;

// Re-export commonly used items
pub use fft::FftProcessor;
pub use spectral::{estimate, PowerSpectrum, SpectralEstimator};
