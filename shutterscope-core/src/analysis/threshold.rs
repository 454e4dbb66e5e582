//! Batch calibration of the open/closed brightness threshold.

use std::collections::BTreeMap;

use super::stats;
use super::types::{BrightnessStats, ThresholdMethod};

/// Percentiles always reported in [`BrightnessStats::percentiles`].
pub const REPORTED_PERCENTILES: [u32; 4] = [10, 25, 75, 90];

/// Number of z values examined by the z-score search.
const ZSCORE_STEPS: usize = 40;
const ZSCORE_MIN: f64 = 1.0;
const ZSCORE_MAX: f64 = 5.0;

/// Computes distribution statistics, the dark baseline and the threshold for
/// a whole brightness sequence.
///
/// An empty sequence yields an all-zero record. [`ThresholdMethod::ZScore`]
/// needs `expected_events_count` and degrades to the original method without it.
#[must_use]
pub fn analyze_brightness_distribution(
    values: &[f64],
    percentile_threshold: u32,
    margin_factor: f64,
    method: ThresholdMethod,
    expected_events_count: Option<usize>,
) -> BrightnessStats {
    if values.is_empty() {
        log::debug!("No brightness samples to analyze, returning empty statistics");
        return BrightnessStats::default();
    }

    let min = stats::min(values);
    let max = stats::max(values);
    let mean = stats::mean(values);
    let median = stats::median(values);

    let percentiles: BTreeMap<u32, f64> = REPORTED_PERCENTILES
        .iter()
        .map(|&p| (p, stats::percentile(values, f64::from(p))))
        .collect();

    let baseline = percentiles
        .get(&percentile_threshold)
        .copied()
        .unwrap_or_else(|| stats::percentile(values, f64::from(percentile_threshold)));

    let threshold = match (method, expected_events_count) {
        (ThresholdMethod::ZScore, Some(expected)) => find_threshold_using_zscore(values, expected),
        (ThresholdMethod::ZScore, None) => {
            log::warn!("Z-score threshold requested without an expected event count, using original method");
            original_threshold(baseline, median, max, margin_factor)
        }
        (ThresholdMethod::Original, _) => original_threshold(baseline, median, max, margin_factor),
    };

    log::debug!(
        "Brightness distribution: min={:.2} max={:.2} mean={:.2} median={:.2} baseline={:.2} threshold={:.2} ({})",
        min,
        max,
        mean,
        median,
        baseline,
        threshold,
        method
    );

    BrightnessStats {
        min,
        max,
        mean,
        median,
        percentiles,
        baseline,
        threshold,
        peak_brightness: None,
    }
}

fn original_threshold(baseline: f64, median: f64, max: f64, margin_factor: f64) -> f64 {
    let threshold = baseline + (median - baseline) * margin_factor;
    if threshold == baseline {
        // Flat dark majority: move off the baseline by a tenth of the range.
        baseline + (max - baseline) * 0.1
    } else {
        threshold
    }
}

/// Searches z in `[1.0, 5.0]` (40 evenly spaced values) for the threshold
/// `mean + z * std` whose count of samples above it is closest to
/// `expected_events_count`. Ties keep the first (lowest) z examined.
///
/// A near-constant sequence (`std < 1e-6`) returns `mean + 0.1`.
#[must_use]
pub fn find_threshold_using_zscore(values: &[f64], expected_events_count: usize) -> f64 {
    let mean = stats::mean(values);
    let std = stats::std_dev(values);
    if std < 1e-6 {
        return mean + 0.1;
    }

    let mut best_threshold = mean;
    let mut best_diff = usize::MAX;

    for step in 0..ZSCORE_STEPS {
        let z = ZSCORE_MIN + (ZSCORE_MAX - ZSCORE_MIN) * step as f64 / (ZSCORE_STEPS - 1) as f64;
        let threshold = mean + z * std;
        let count = values.iter().filter(|&&v| v > threshold).count();
        let diff = count.abs_diff(expected_events_count);
        if diff < best_diff {
            best_diff = diff;
            best_threshold = threshold;
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark_with_flashes() -> Vec<f64> {
        let mut values = vec![20.0; 40];
        values[10] = 200.0;
        values[11] = 210.0;
        values[25] = 205.0;
        values
    }

    #[test]
    fn test_empty_values_yield_zero_stats() {
        let stats = analyze_brightness_distribution(&[], 25, 1.5, ThresholdMethod::Original, None);
        assert_eq!(stats, BrightnessStats::default());
        assert!(stats.percentiles.is_empty());
    }

    #[test]
    fn test_original_method_uses_median_margin() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let stats = analyze_brightness_distribution(&values, 25, 1.5, ThresholdMethod::Original, None);
        assert_eq!(stats.baseline, 20.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.threshold, 35.0);
        assert_eq!(stats.percentiles.len(), 4);
        assert_eq!(stats.percentiles[&90], 50.0);
    }

    #[test]
    fn test_original_method_flat_baseline_fallback() {
        let values = dark_with_flashes();
        let stats = analyze_brightness_distribution(&values, 25, 1.5, ThresholdMethod::Original, None);
        assert_eq!(stats.baseline, 20.0);
        // median == baseline, so threshold moves 10% toward the max
        assert!((stats.threshold - (20.0 + (210.0 - 20.0) * 0.1)).abs() < 1e-9);
        assert!(stats.threshold >= stats.baseline);
    }

    #[test]
    fn test_non_standard_percentile_is_computed_directly() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let stats = analyze_brightness_distribution(&values, 50, 1.5, ThresholdMethod::Original, None);
        assert_eq!(stats.baseline, 30.0);
    }

    #[test]
    fn test_zscore_finds_expected_count() {
        let values = dark_with_flashes();
        let threshold = find_threshold_using_zscore(&values, 3);
        let count = values.iter().filter(|&&v| v > threshold).count();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_zscore_ties_keep_smallest_z() {
        let values = dark_with_flashes();
        let first_z = stats::mean(&values) + stats::std_dev(&values);
        // z from 1 up to about 3.4 all isolate the three flashes
        assert!((find_threshold_using_zscore(&values, 3) - first_z).abs() < 1e-9);
        // Unreachable count: z = 1 already comes closest
        assert!((find_threshold_using_zscore(&values, 10) - first_z).abs() < 1e-9);
    }

    #[test]
    fn test_zscore_constant_sequence() {
        assert!((find_threshold_using_zscore(&[5.0; 10], 2) - 5.1).abs() < 1e-9);
    }

    #[test]
    fn test_zscore_without_expected_count_degrades() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let zscore = analyze_brightness_distribution(&values, 25, 1.5, ThresholdMethod::ZScore, None);
        let original = analyze_brightness_distribution(&values, 25, 1.5, ThresholdMethod::Original, None);
        assert_eq!(zscore.threshold, original.threshold);
    }
}
