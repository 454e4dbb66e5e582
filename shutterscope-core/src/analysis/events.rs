//! Segmentation of a brightness sequence into shutter-open events.

use super::stats;
use super::threshold::analyze_brightness_distribution;
use super::types::{BrightnessStats, RawEvent, ShutterEvent, ThresholdMethod};
use crate::config::AnalysisConfig;

/// Percentile of all event samples used when no event has a usable plateau.
const PEAK_FALLBACK_PERCENTILE: f64 = 95.0;

/// A sample is "open" iff it is strictly above the threshold.
#[inline]
#[must_use]
pub fn is_shutter_open(brightness: f64, threshold: f64) -> bool {
    brightness > threshold
}

/// Splits `values` into maximal runs of open samples, in frame order.
///
/// A run that is still open at the end of the sequence ends at the last index.
#[must_use]
pub fn find_shutter_events(values: &[f64], threshold: f64) -> Vec<RawEvent> {
    let mut events = Vec::new();
    let mut current: Option<(usize, Vec<f64>)> = None;

    for (index, &brightness) in values.iter().enumerate() {
        if is_shutter_open(brightness, threshold) {
            match current.as_mut() {
                Some((_, samples)) => samples.push(brightness),
                None => current = Some((index, vec![brightness])),
            }
        } else if let Some((start, samples)) = current.take() {
            events.push(RawEvent {
                start_frame: start,
                end_frame: index - 1,
                brightness_values: samples,
            });
        }
    }

    if let Some((start, samples)) = current {
        events.push(RawEvent {
            start_frame: start,
            end_frame: values.len() - 1,
            brightness_values: samples,
        });
    }

    events
}

/// Estimates the "fully open" brightness from the plateaus of detected events.
///
/// For each event, samples at or above `event_max * plateau_threshold` form the
/// plateau; plateaus with at least `min_plateau_frames` samples contribute their
/// mean and the median of those means is returned. When no event qualifies the
/// 95th percentile of every event sample is used instead. `None` only when
/// there are no samples at all.
#[must_use]
pub fn calculate_peak_brightness(
    events: &[RawEvent],
    plateau_threshold: f64,
    min_plateau_frames: usize,
) -> Option<f64> {
    let plateau_means: Vec<f64> = events
        .iter()
        .filter(|event| !event.brightness_values.is_empty())
        .filter_map(|event| {
            let event_max = stats::max(&event.brightness_values);
            let plateau: Vec<f64> = event
                .brightness_values
                .iter()
                .copied()
                .filter(|&b| b >= event_max * plateau_threshold)
                .collect();
            (plateau.len() >= min_plateau_frames).then(|| stats::mean(&plateau))
        })
        .collect();

    if !plateau_means.is_empty() {
        return Some(stats::median(&plateau_means));
    }

    let all_samples: Vec<f64> = events
        .iter()
        .flat_map(|event| event.brightness_values.iter().copied())
        .collect();
    if all_samples.is_empty() {
        return None;
    }

    log::debug!(
        "No event reached {} plateau frames, using 95th percentile of event samples",
        min_plateau_frames
    );
    Some(stats::percentile(&all_samples, PEAK_FALLBACK_PERCENTILE))
}

/// Attaches the calibration baseline and peak to each raw event.
#[must_use]
pub fn create_shutter_events(raw_events: &[RawEvent], stats: &BrightnessStats) -> Vec<ShutterEvent> {
    raw_events
        .iter()
        .cloned()
        .map(|raw| {
            ShutterEvent::from(raw)
                .with_baseline(Some(stats.baseline))
                .with_peak(stats.peak_brightness)
        })
        .collect()
}

/// Calibrates, segments and estimates the peak in one pass.
///
/// The returned statistics carry the estimated `peak_brightness`.
#[must_use]
pub fn analyze_and_find_events(
    values: &[f64],
    config: &AnalysisConfig,
    method: ThresholdMethod,
    expected_events_count: Option<usize>,
) -> (BrightnessStats, Vec<RawEvent>) {
    let mut stats = analyze_brightness_distribution(
        values,
        config.percentile_threshold,
        config.margin_factor,
        method,
        expected_events_count,
    );

    if values.is_empty() {
        return (stats, Vec::new());
    }

    let events = find_shutter_events(values, stats.threshold);
    stats.peak_brightness =
        calculate_peak_brightness(&events, config.plateau_threshold, config.min_plateau_frames);

    log::info!(
        "Found {} shutter event(s) above threshold {:.2} (baseline {:.2}, peak {})",
        events.len(),
        stats.threshold,
        stats.baseline,
        stats
            .peak_brightness
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.2}"))
    );

    (stats, events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event_in_the_middle() {
        let events = find_shutter_events(&[20.0, 20.0, 80.0, 100.0, 80.0, 20.0, 20.0], 50.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start_frame, 2);
        assert_eq!(events[0].end_frame, 4);
        assert_eq!(events[0].brightness_values, vec![80.0, 100.0, 80.0]);
    }

    #[test]
    fn test_event_open_at_end_of_sequence() {
        let events = find_shutter_events(&[20.0, 20.0, 80.0, 100.0, 100.0], 50.0);
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start_frame, events[0].end_frame), (2, 4));
    }

    #[test]
    fn test_threshold_is_strict() {
        let events = find_shutter_events(&[50.0, 50.0, 51.0, 50.0], 50.0);
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start_frame, events[0].end_frame), (2, 2));
    }

    #[test]
    fn test_multiple_events_are_ordered_and_disjoint() {
        let values = [90.0, 10.0, 90.0, 90.0, 10.0, 10.0, 90.0];
        let events = find_shutter_events(&values, 50.0);
        let ranges: Vec<(usize, usize)> = events.iter().map(|e| (e.start_frame, e.end_frame)).collect();
        assert_eq!(ranges, vec![(0, 0), (2, 3), (6, 6)]);
    }

    #[test]
    fn test_peak_from_plateau_means() {
        let long = RawEvent {
            start_frame: 0,
            end_frame: 11,
            brightness_values: vec![100.0; 12],
        };
        let longer = RawEvent {
            start_frame: 20,
            end_frame: 34,
            brightness_values: vec![120.0; 15],
        };
        let short = RawEvent {
            start_frame: 40,
            end_frame: 42,
            brightness_values: vec![250.0, 250.0, 250.0],
        };
        let peak = calculate_peak_brightness(&[long, longer, short], 0.90, 10);
        assert_eq!(peak, Some(110.0));
    }

    #[test]
    fn test_peak_falls_back_to_percentile() {
        let event = RawEvent {
            start_frame: 0,
            end_frame: 4,
            brightness_values: vec![60.0, 70.0, 80.0, 90.0, 100.0],
        };
        assert_eq!(calculate_peak_brightness(&[event], 0.90, 10), Some(100.0));
    }

    #[test]
    fn test_peak_none_without_samples() {
        assert_eq!(calculate_peak_brightness(&[], 0.90, 10), None);
        let empty = RawEvent {
            start_frame: 3,
            end_frame: 3,
            brightness_values: Vec::new(),
        };
        assert_eq!(calculate_peak_brightness(&[empty], 0.90, 10), None);
    }

    #[test]
    fn test_analyze_and_find_events_sets_peak() {
        let mut values = vec![20.0; 30];
        for v in values.iter_mut().skip(10).take(12) {
            *v = 200.0;
        }
        let config = AnalysisConfig::default();
        let (stats, events) = analyze_and_find_events(&values, &config, ThresholdMethod::Original, None);
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].start_frame, events[0].end_frame), (10, 21));
        assert_eq!(stats.peak_brightness, Some(200.0));

        let shutter_events = create_shutter_events(&events, &stats);
        assert_eq!(shutter_events[0].baseline_brightness(), Some(stats.baseline));
        assert_eq!(shutter_events[0].peak_brightness(), Some(200.0));
    }
}
