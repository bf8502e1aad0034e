//! Moving-average smoothing

/// Centered moving average. The window shrinks near the edges so the output
/// has the same length as the input. Windows of 0 or 1 return a copy.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.len() < 2 {
        return values.to_vec();
    }
    let before = (window - 1) / 2;
    let after = window / 2;
    let n = values.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(n - 1);
            let slice = &values[lo..=hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_series_is_unchanged() {
        let flat = vec![-90.0; 12];
        assert_eq!(moving_average(&flat, 5), flat);
    }

    #[test]
    fn impulse_is_spread_over_window() {
        let mut series = vec![0.0; 9];
        series[4] = 5.0;
        let smoothed = moving_average(&series, 5);
        assert_eq!(smoothed, vec![0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn edges_use_shrunken_window() {
        let smoothed = moving_average(&[3.0, 0.0, 0.0, 0.0, 0.0], 5);
        // Index 0 averages [3, 0, 0]
        assert!((smoothed[0] - 1.0).abs() < 1e-12);
        assert_eq!(smoothed.len(), 5);
    }

    #[test]
    fn trivial_windows_copy_input() {
        let series = vec![1.0, 2.0, 3.0];
        assert_eq!(moving_average(&series, 0), series);
        assert_eq!(moving_average(&series, 1), series);
        assert!(moving_average(&[], 5).is_empty());
    }
}
