//! Peak search primitives on a uniformly indexed series

/// Indices of local maxima. A plateau counts once, at its middle sample
/// (rounded down), and only when both neighbours of the plateau are lower.
/// Endpoints never qualify.
pub fn local_maxima(series: &[f64]) -> Vec<usize> {
    let n = series.len();
    let mut maxima = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if series[i] > series[i - 1] {
            // Walk to the end of a possible plateau
            let mut j = i;
            while j + 1 < n && series[j + 1] == series[i] {
                j += 1;
            }
            if j + 1 < n && series[j + 1] < series[i] {
                maxima.push((i + j) / 2);
            }
            i = j + 1;
        } else {
            i += 1;
        }
    }
    maxima
}

/// Topographic prominence of the sample at `peak`: the drop to the higher of
/// the two bases, where each base is the lowest point between the peak and
/// the nearest strictly higher sample (or the series boundary) on that side.
pub fn prominence(series: &[f64], peak: usize) -> f64 {
    let height = series[peak];

    let mut left_base = height;
    for &v in series[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_base = left_base.min(v);
    }

    let mut right_base = height;
    for &v in &series[peak + 1..] {
        if v > height {
            break;
        }
        right_base = right_base.min(v);
    }

    height - left_base.max(right_base)
}

/// Frequencies where the series first falls to `level` on each side of
/// `peak`, interpolated between neighbouring samples. A side that never
/// reaches the level is clamped to the series boundary.
pub fn half_level_crossings(
    frequencies: &[f64],
    series: &[f64],
    peak: usize,
    level: f64,
) -> (f64, f64) {
    let n = series.len();

    let mut j = peak;
    while j > 0 && series[j - 1] > level {
        j -= 1;
    }
    let left = if j == 0 {
        frequencies[0]
    } else {
        interpolate(frequencies, series, j - 1, j, level)
    };

    let mut k = peak;
    while k + 1 < n && series[k + 1] > level {
        k += 1;
    }
    let right = if k + 1 >= n {
        frequencies[n - 1]
    } else {
        interpolate(frequencies, series, k + 1, k, level)
    };

    (left, right)
}

/// Position of `level` between sample `below` (at or under the level) and
/// sample `above`
fn interpolate(frequencies: &[f64], series: &[f64], below: usize, above: usize, level: f64) -> f64 {
    let rise = series[above] - series[below];
    if rise <= 0.0 {
        return frequencies[below];
    }
    let t = ((level - series[below]) / rise).clamp(0.0, 1.0);
    frequencies[below] + t * (frequencies[above] - frequencies[below])
}
