//! DC-spike suppression
//!
//! Direct-conversion tuners leave a fixed spike in the bins around the tuned
//! center that has nothing to do with the received signal. The spike window
//! is replaced by a cubic least-squares fit of the bins on either side, and a
//! margin on each side is cross-faded into the fit so no step appears at the
//! window edges.

use crate::domain::DcSpikeConfig;

const POLY_DEGREE: usize = 3;

/// Local model of the spectrum used to fill the spike window
#[derive(Debug, Clone, PartialEq)]
enum Fill {
    /// Polynomial coefficients in the normalized coordinate, lowest order first
    Poly { coeffs: Vec<f64>, origin: f64, scale: f64 },
    /// Straight line through two anchor bins
    Linear { x0: f64, y0: f64, x1: f64, y1: f64 },
    /// Only one side available
    Constant(f64),
}

impl Fill {
    fn predict(&self, bin: usize) -> f64 {
        let x = bin as f64;
        match self {
            Fill::Poly { coeffs, origin, scale } => {
                let t = (x - origin) / scale;
                coeffs.iter().rev().fold(0.0, |acc, c| acc * t + c)
            }
            Fill::Linear { x0, y0, x1, y1 } => y0 + (y1 - y0) * (x - x0) / (x1 - x0),
            Fill::Constant(y) => *y,
        }
    }
}

/// Replace the bins around `center` with a smooth estimate, in place.
///
/// All ranges are clamped to the buffer, so a window touching either end only
/// uses the support that exists. With no support on either side the spectrum
/// is left untouched.
pub fn remove_dc_spike(spectrum: &mut [f32], center: usize, config: &DcSpikeConfig) {
    let n = spectrum.len();
    if !config.enabled || n == 0 {
        return;
    }
    let center = center.min(n - 1);
    let win_lo = center.saturating_sub(config.half_width);
    let win_hi = (center + config.half_width).min(n - 1);

    let left = win_lo.saturating_sub(config.fit_span)..win_lo;
    let right = (win_hi + 1).min(n)..(win_hi + 1 + config.fit_span).min(n);

    let support: Vec<(f64, f64)> = left
        .clone()
        .chain(right.clone())
        .map(|i| (i as f64, spectrum[i] as f64))
        .collect();
    if support.is_empty() {
        return;
    }

    let fill = choose_fill(&support, center, config, &left, &right, spectrum);
    let original: Vec<f32> = spectrum.to_vec();

    for (bin, value) in spectrum.iter_mut().enumerate().take(win_hi + 1).skip(win_lo) {
        *value = fill.predict(bin) as f32;
    }

    // Cross-fade: weight 1 next to the window, falling toward 0 at the margin's edge
    let margin = config.blend_margin;
    for d in 1..=margin {
        let weight = 1.0 - d as f64 / (margin + 1) as f64;
        if let Some(bin) = win_lo.checked_sub(d) {
            spectrum[bin] = blend(original[bin], fill.predict(bin), weight);
        }
        let bin = win_hi + d;
        if bin < n {
            spectrum[bin] = blend(original[bin], fill.predict(bin), weight);
        }
    }
}

fn blend(original: f32, predicted: f64, weight: f64) -> f32 {
    ((1.0 - weight) * original as f64 + weight * predicted) as f32
}

fn choose_fill(
    support: &[(f64, f64)],
    center: usize,
    config: &DcSpikeConfig,
    left: &std::ops::Range<usize>,
    right: &std::ops::Range<usize>,
    spectrum: &[f32],
) -> Fill {
    let origin = center as f64;
    let scale = (config.half_width + config.fit_span).max(1) as f64;
    let (xs, ys): (Vec<f64>, Vec<f64>) = support
        .iter()
        .map(|&(x, y)| ((x - origin) / scale, y))
        .unzip();

    if let Some(coeffs) = fit_polynomial(&xs, &ys, POLY_DEGREE) {
        return Fill::Poly { coeffs, origin, scale };
    }

    log::debug!("DC fit singular with {} support bins, using linear fill", support.len());
    // Nearest bin on each side of the window
    let left_anchor = left.clone().last().map(|i| (i as f64, spectrum[i] as f64));
    let right_anchor = right.clone().next().map(|i| (i as f64, spectrum[i] as f64));
    match (left_anchor, right_anchor) {
        (Some((x0, y0)), Some((x1, y1))) => Fill::Linear { x0, y0, x1, y1 },
        (Some((_, y)), None) | (None, Some((_, y))) => Fill::Constant(y),
        // Unreachable with non-empty support; keep the spectrum level
        (None, None) => Fill::Constant(spectrum[center] as f64),
    }
}

/// Least-squares polynomial fit of `degree`, coefficients lowest order first.
/// Returns `None` when there are too few distinct points or the normal
/// equations are numerically singular.
pub fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    let terms = degree + 1;
    if xs.len() != ys.len() || xs.len() < terms {
        return None;
    }

    // Normal equations: (AᵀA) c = Aᵀy, augmented column at index `terms`
    let mut m = vec![vec![0.0f64; terms + 1]; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let mut powers = vec![1.0f64; 2 * terms - 1];
        for k in 1..powers.len() {
            powers[k] = powers[k - 1] * x;
        }
        for row in 0..terms {
            for col in 0..terms {
                m[row][col] += powers[row + col];
            }
            m[row][terms] += powers[row] * y;
        }
    }

    let scale = m
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0, f64::max);
    if scale == 0.0 {
        return None;
    }

    // Gaussian elimination with partial pivoting
    for col in 0..terms {
        let pivot = (col..terms).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 * scale {
            return None;
        }
        m.swap(col, pivot);
        for row in col + 1..terms {
            let factor = m[row][col] / m[col][col];
            for k in col..=terms {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    // Back substitution
    let mut coeffs = vec![0.0f64; terms];
    for row in (0..terms).rev() {
        let tail: f64 = (row + 1..terms).map(|k| m[row][k] * coeffs[k]).sum();
        coeffs[row] = (m[row][terms] - tail) / m[row][row];
    }

    coeffs.iter().all(|c| c.is_finite()).then_some(coeffs)
}
