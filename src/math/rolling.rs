//! Trailing-window statistics over price-derived series.
//!
//! Every function here returns a series of the same length as its input.
//! Positions that do not yet have a full trailing window are `None`, so
//! callers never have to reason about NaN padding.
//!
//! # Mathematical Model
//!
//! For a window of size `w` ending at index `i`:
//!
//! ```text
//! mean[i] = (x[i-w+1] + ... + x[i]) / w
//! std[i]  = sqrt( Σ (x[k] - mean[i])² / (w - 1) )
//! ```
//!
//! The standard deviation is the *sample* estimator (Bessel's correction),
//! which is what rolling statistics in most dataframe libraries report.
//!
//! # Usage
//!
//! ```rust
//! use pairpilot::math::rolling_stats;
//!
//! let stats = rolling_stats(&[1.0, 2.0, 3.0, 4.0], 3);
//! assert!(stats[1].is_none());
//! assert_eq!(stats[2].map(|s| s.mean), Some(2.0));
//! ```

/// Mean and sample standard deviation of one trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (divisor `n - 1`). `None` for fewer than two values.
///
/// A run of identical values is exactly `0.0`. The float mean of such a run
/// can land a few ulps off the value, which would otherwise leave a residue
/// around 1e-16.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    if is_flat(values) {
        return Some(0.0);
    }
    let mean = mean(values)?;
    let sum_sq: f64 = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Rolling mean and sample standard deviation.
///
/// Entry `i` is `Some` only when `i >= window - 1`. A `window` smaller than
/// two cannot produce a sample deviation, so every entry is `None`.
///
/// Each window is recomputed with a two-pass sum, so no rounding drift
/// carries over from earlier windows.
pub fn rolling_stats(values: &[f64], window: usize) -> Vec<Option<WindowStats>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            if is_flat(slice) {
                return Some(WindowStats {
                    mean: slice[0],
                    std_dev: 0.0,
                });
            }
            let mean = mean(slice)?;
            let std_dev = sample_std_dev(slice)?;
            Some(WindowStats { mean, std_dev })
        })
        .collect()
}

fn is_flat(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_undefined() {
        let stats = rolling_stats(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(stats.len(), 5);
        assert!(stats[0].is_none());
        assert!(stats[1].is_none());
        assert!(stats[2].is_some());
    }

    #[test]
    fn test_sample_std_matches_manual_value() {
        // mean = 2, squared deviations = 1 + 0 + 1, / (3 - 1) = 1
        let stats = rolling_stats(&[1.0, 2.0, 3.0], 3);
        let last = stats[2].unwrap();
        assert!((last.mean - 2.0).abs() < 1e-12);
        assert!((last.std_dev - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_window_has_exact_zero_std() {
        let stats = rolling_stats(&[2.1, 2.1, 2.1, 2.1], 4);
        assert_eq!(stats[3].unwrap().std_dev, 0.0);
    }

    #[test]
    fn test_flat_runs_of_inexact_values_have_exact_zero_std() {
        for value in [0.1, 2.1, 64123.45 / 3101.17] {
            let stats = rolling_stats(&vec![value; 20], 20);
            let last = stats[19].unwrap();
            assert_eq!(last.std_dev, 0.0, "value {value}");
            assert_eq!(last.mean, value);
            assert_eq!(sample_std_dev(&[value; 3]), Some(0.0));
        }
    }

    #[test]
    fn test_window_below_two_is_all_none() {
        assert!(rolling_stats(&[1.0, 2.0], 1).iter().all(Option::is_none));
        assert!(rolling_stats(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn test_helpers_on_short_input() {
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std_dev(&[1.0]), None);
    }
}
