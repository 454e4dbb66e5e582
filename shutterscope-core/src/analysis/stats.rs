//! Numeric helpers over brightness sample sequences.
//!
//! All functions accept any slice and never panic: an empty slice yields
//! `0.0`. Percentiles use the nearest-rank convention
//! `index = round(p / 100 * (n - 1))` over a sorted copy, shared by every
//! caller in the crate.

/// Arithmetic mean, `0.0` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Smallest value, `0.0` for an empty slice.
#[must_use]
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

/// Largest value, `0.0` for an empty slice.
#[must_use]
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median; the two middle values are averaged for even lengths.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Nearest-rank percentile. `p` is clamped to `[0, 100]`, so
/// `percentile(v, 0.0) == min(v)` and `percentile(v, 100.0) == max(v)`.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    sorted[rank_index(sorted.len(), p)]
}

pub(crate) fn rank_index(len: usize, p: f64) -> usize {
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let index = (p / 100.0 * (len.saturating_sub(1)) as f64).round() as usize;
    index.min(len.saturating_sub(1))
}

/// Population standard deviation, `0.0` for an empty slice.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[1.0, 3.0, 5.0, 7.0, 9.0]), 5.0);
        assert_eq!(median(&[1.0, 3.0, 5.0, 7.0]), 4.0);
        assert_eq!(median(&[9.0, 1.0, 5.0]), 5.0);
    }

    #[test]
    fn test_percentile_bounds_match_min_and_max() {
        let values = [42.0, 7.0, 19.5, 88.0, 63.0, 7.5];
        assert_eq!(percentile(&values, 0.0), min(&values));
        assert_eq!(percentile(&values, 100.0), max(&values));
        assert_eq!(percentile(&values, 150.0), 88.0);
        assert_eq!(percentile(&values, -10.0), 7.0);
    }

    #[test]
    fn test_percentile_uses_rounded_rank() {
        // n = 5: p25 -> round(1.0) = 1, p90 -> round(3.6) = 4
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 25.0), 20.0);
        assert_eq!(percentile(&values, 90.0), 50.0);
        // n = 4: p50 -> round(1.5) = 2
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 3.0);
    }

    #[test]
    fn test_std_dev_constant_is_zero() {
        assert_eq!(std_dev(&[5.0, 5.0, 5.0, 5.0, 5.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(min(&[]), 0.0);
        assert_eq!(max(&[]), 0.0);
        assert_eq!(median(&[]), 0.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }
}
