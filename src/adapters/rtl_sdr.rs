//! RTL-SDR dongle adapter.
//!
//! Enable the `hardware` feature to compile with librtlsdr support. Without
//! it the driver still exists but every `open` reports the device as
//! unavailable, so the worker binary builds on machines without the library.

use crate::domain::{ScanError, ScanResult, TunerSettings};
use crate::ports::{SdrDriver, SdrSession};

#[cfg(feature = "hardware")]
use crate::domain::{Frequency, GainMode, IqSample};
#[cfg(feature = "hardware")]
use num_complex::Complex;

/// Driver for RTL2832U-based dongles. librtlsdr enforces the exclusive
/// USB claim itself, a second open of a busy device fails.
#[derive(Debug, Default, Clone)]
pub struct RtlSdrDriver;

impl RtlSdrDriver {
    pub fn new() -> Self {
        Self
    }
}

/// Convert interleaved unsigned 8-bit I/Q into complex samples in -1..1
pub fn convert_u8_iq(buf: &[u8]) -> Vec<num_complex::Complex<f32>> {
    buf.chunks_exact(2)
        .map(|iq| {
            num_complex::Complex::new(
                (iq[0] as f32 - 127.5) / 127.5,
                (iq[1] as f32 - 127.5) / 127.5,
            )
        })
        .collect()
}

#[cfg(feature = "hardware")]
impl SdrDriver for RtlSdrDriver {
    fn name(&self) -> String {
        "RTL-SDR".to_string()
    }

    fn open(&self, settings: &TunerSettings) -> ScanResult<Box<dyn SdrSession>> {
        log::info!("Opening RTL-SDR device {}...", settings.device_index);

        #[allow(clippy::cast_possible_wrap)]
        let mut device = rtlsdr::open(settings.device_index as i32).map_err(|e| {
            ScanError::HardwareUnavailable(format!(
                "Failed to open RTL-SDR device {}: {e}",
                settings.device_index
            ))
        })?;

        let configured = configure(&mut device, settings);
        if let Err(e) = configured {
            let _ = device.close();
            return Err(e);
        }

        log::info!("RTL-SDR configured:");
        log::info!("  Sample rate: {:.3} MHz", settings.sample_rate as f64 / 1e6);
        log::info!("  Gain: {:?}", settings.gain);
        log::info!("  PPM correction: {}", settings.ppm_correction);

        Ok(Box::new(RtlSdrSession {
            device: Some(device),
            sample_rate: settings.sample_rate,
        }))
    }
}

#[cfg(feature = "hardware")]
fn configure(device: &mut rtlsdr::RTLSDRDevice, settings: &TunerSettings) -> ScanResult<()> {
    let unavailable = |what: &str, e: rtlsdr::RTLSDRError| {
        ScanError::HardwareUnavailable(format!("Failed to set {what}: {e}"))
    };

    device
        .set_sample_rate(settings.sample_rate)
        .map_err(|e| unavailable("sample rate", e))?;

    match settings.gain {
        GainMode::Auto => {
            // false = automatic
            device
                .set_tuner_gain_mode(false)
                .map_err(|e| unavailable("gain mode", e))?;
        }
        GainMode::Manual(tenths_db) => {
            device
                .set_tuner_gain_mode(true)
                .map_err(|e| unavailable("gain mode", e))?;
            device
                .set_tuner_gain(tenths_db)
                .map_err(|e| unavailable("gain", e))?;
        }
    }

    if settings.ppm_correction != 0 {
        device
            .set_freq_correction(settings.ppm_correction)
            .map_err(|e| unavailable("PPM correction", e))?;
    }

    device
        .reset_buffer()
        .map_err(|e| unavailable("buffer reset", e))
}

#[cfg(feature = "hardware")]
pub struct RtlSdrSession {
    device: Option<rtlsdr::RTLSDRDevice>,
    sample_rate: u32,
}

#[cfg(feature = "hardware")]
impl RtlSdrSession {
    fn device(&mut self) -> ScanResult<&mut rtlsdr::RTLSDRDevice> {
        self.device
            .as_mut()
            .ok_or_else(|| ScanError::HardwareIo("session is closed".into()))
    }
}

#[cfg(feature = "hardware")]
impl SdrSession for RtlSdrSession {
    fn tune(&mut self, freq: Frequency) -> ScanResult<()> {
        let hz = freq.as_hz();
        if !(0.0..=u32::MAX as f64).contains(&hz) {
            return Err(ScanError::HardwareIo(format!(
                "Center frequency {hz} Hz is out of range for RTL-SDR"
            )));
        }
        self.device()?
            .set_center_freq(hz as u32)
            .map_err(|e| ScanError::HardwareIo(format!("Failed to set center frequency: {e}")))
    }

    fn capture(&mut self, n: usize) -> ScanResult<Vec<IqSample>> {
        // USB transfers are multiples of 512 bytes
        let bytes = (n * 2).div_ceil(512) * 512;
        let buf = self
            .device()?
            .read_sync(bytes)
            .map_err(|e| ScanError::HardwareIo(format!("RTL-SDR read failed: {e}")))?;

        if buf.len() < n * 2 {
            return Err(ScanError::TransientCapture(format!(
                "short read: {} of {} bytes",
                buf.len(),
                n * 2
            )));
        }

        let samples: Vec<Complex<f32>> = convert_u8_iq(&buf[..n * 2]);
        Ok(samples)
    }

    fn close(&mut self) -> ScanResult<()> {
        if let Some(mut device) = self.device.take() {
            log::info!("Closing RTL-SDR device");
            device
                .close()
                .map_err(|e| ScanError::HardwareIo(format!("Failed to close device: {e}")))?;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.device.is_some()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(feature = "hardware")]
impl Drop for RtlSdrSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(not(feature = "hardware"))]
impl SdrDriver for RtlSdrDriver {
    fn name(&self) -> String {
        "RTL-SDR (not compiled)".to_string()
    }

    fn open(&self, settings: &TunerSettings) -> ScanResult<Box<dyn SdrSession>> {
        log::warn!("RTL-SDR hardware support not compiled (enable 'hardware' feature)");
        Err(ScanError::HardwareUnavailable(format!(
            "RTL-SDR support not compiled, cannot open device {}",
            settings.device_index
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u8_samples_map_to_unit_range() {
        let samples = convert_u8_iq(&[0, 255, 128, 127, 7]);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].re, -1.0);
        assert_eq!(samples[0].im, 1.0);
        assert!((samples[1].re - 0.5 / 127.5).abs() < 1e-6);
        assert!((samples[1].im + 0.5 / 127.5).abs() < 1e-6);
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn open_without_hardware_support_is_unavailable() {
        let result = RtlSdrDriver::new().open(&TunerSettings::default());
        assert!(matches!(result, Err(ScanError::HardwareUnavailable(_))));
    }
}
