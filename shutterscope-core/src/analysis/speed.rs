//! Conversion of event durations into shutter speeds, comparison against
//! expected speeds, and parsing/formatting of speed notation.
//!
//! Speeds use the `1/x` convention throughout: `500.0` is 1/500 s and `0.5`
//! is a two second exposure.

use super::types::{ShutterEvent, ShutterSpeedResult, SpeedGroup};
use crate::error::{CoreError, CoreResult};
use crate::utils::trim_decimal;

/// Speed for an exposure of `frame_count` frames at `fps`: `1 / (frame_count / fps)`.
///
/// Non-positive inputs have no meaningful speed and yield `0.0`.
#[must_use]
pub fn calculate_shutter_speed(frame_count: f64, fps: f64) -> f64 {
    if frame_count <= 0.0 || fps <= 0.0 || !frame_count.is_finite() || !fps.is_finite() {
        return 0.0;
    }
    1.0 / (frame_count / fps)
}

/// Speed of a single event.
///
/// The weighted duration is used when `use_weighted` is set and the event
/// carries a baseline; `recording_fps` replaces `fps` for slow-motion footage.
#[must_use]
pub fn shutter_speed_for_event(
    event: &ShutterEvent,
    fps: f64,
    recording_fps: Option<f64>,
    use_weighted: bool,
) -> f64 {
    let frame_count = if use_weighted && event.baseline_brightness().is_some() {
        event.weighted_duration_frames()
    } else {
        event.duration_frames() as f64
    };
    calculate_shutter_speed(frame_count, recording_fps.unwrap_or(fps))
}

/// Wall-clock duration of the inclusive frame range, corrected for
/// slow-motion playback when `recording_fps` is given.
#[must_use]
pub fn calculate_duration_seconds(
    start_frame: usize,
    end_frame: usize,
    fps: f64,
    recording_fps: Option<f64>,
) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    let frames = (end_frame.saturating_sub(start_frame) + 1) as f64;
    let seconds = frames / fps;
    match recording_fps {
        Some(recording) if recording > 0.0 => seconds * (fps / recording),
        _ => seconds,
    }
}

/// Percentage deviation of `measured` from `expected`. Positive means the
/// measured speed is faster than expected.
#[must_use]
pub fn compare_with_expected(measured: f64, expected: f64) -> f64 {
    (measured - expected) / expected * 100.0
}

/// Measures every event without pairing it to an expected speed.
#[must_use]
pub fn measure_events(
    events: &[ShutterEvent],
    fps: f64,
    recording_fps: Option<f64>,
) -> Vec<ShutterSpeedResult> {
    events
        .iter()
        .map(|event| ShutterSpeedResult {
            event: event.clone(),
            measured_speed: shutter_speed_for_event(event, fps, recording_fps, true),
            expected_speed: None,
            error_percent: None,
        })
        .collect()
}

/// Pairs events with expected speeds: shortest event with fastest speed.
///
/// Expected speeds are sorted fastest first and events by ascending
/// `duration_frames`; only the first `min(events, speeds)` pairs are kept.
/// Results are returned in fastest-first order, equal expected speeds sharing
/// one group.
#[must_use]
pub fn group_shutter_events(
    events: &[ShutterEvent],
    expected_speeds: &[f64],
    fps: f64,
    recording_fps: Option<f64>,
) -> Vec<SpeedGroup> {
    let mut speeds = expected_speeds.to_vec();
    speeds.sort_by(|a, b| b.total_cmp(a));

    let mut sorted_events: Vec<&ShutterEvent> = events.iter().collect();
    sorted_events.sort_by_key(|event| event.duration_frames());

    let pairs = sorted_events.len().min(speeds.len());
    if events.len() != speeds.len() {
        log::warn!(
            "{} event(s) and {} expected speed(s); comparing the first {}",
            events.len(),
            speeds.len(),
            pairs
        );
    }

    let mut groups: Vec<SpeedGroup> = Vec::new();
    for (event, &expected) in sorted_events.into_iter().zip(speeds.iter()).take(pairs) {
        let measured = shutter_speed_for_event(event, fps, recording_fps, true);
        let result = ShutterSpeedResult {
            event: event.clone().with_expected_speed_label(format_speed_label(expected)),
            measured_speed: measured,
            expected_speed: Some(expected),
            error_percent: Some(compare_with_expected(measured, expected)),
        };

        match groups.last_mut() {
            Some(group) if group.expected_speed == expected => group.results.push(result),
            _ => groups.push(SpeedGroup {
                expected_speed: expected,
                results: vec![result],
            }),
        }
    }

    groups
}

/// Formats a measured speed: `1/N` at or above one, otherwise seconds with
/// two decimals (`0.5` -> `"2.00s"`).
#[must_use]
pub fn format_shutter_speed(speed: f64) -> String {
    if !speed.is_finite() || speed <= 0.0 {
        return "-".to_string();
    }
    if speed >= 1.0 {
        format!("1/{}", speed.round() as u64)
    } else {
        format!("{:.2}s", 1.0 / speed)
    }
}

/// Formats a nominal speed the way it is written on a dial: `1/500`, `2s`,
/// `2.5s`.
#[must_use]
pub fn format_speed_label(speed: f64) -> String {
    if !speed.is_finite() || speed <= 0.0 {
        return "-".to_string();
    }
    if speed >= 1.0 {
        format!("1/{}", speed.round() as u64)
    } else {
        format!("{}s", trim_decimal(1.0 / speed, 2))
    }
}

/// Parses a comma-separated list of nominal speeds such as `"1/500, 1/250, 2"`.
///
/// Entries are fractions of a second or plain seconds; blank entries are
/// skipped. The result uses the `1/x` convention (`[500.0, 250.0, 0.5]`).
pub fn parse_shutter_speeds(input: &str) -> CoreResult<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_single_speed)
        .collect()
}

fn parse_single_speed(part: &str) -> CoreResult<f64> {
    let invalid = || CoreError::InvalidSpeed(part.to_string());
    let parse = |s: &str| s.trim().parse::<f64>().map_err(|_| invalid());

    let seconds = match part.split_once('/') {
        Some((numerator, denominator)) => parse(numerator)? / parse(denominator)?,
        None => parse(part.trim_end_matches('s'))?,
    };

    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(invalid());
    }
    Ok(1.0 / seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: usize, end: usize) -> ShutterEvent {
        ShutterEvent::new(start, end, vec![200.0; end - start + 1])
    }

    #[test]
    fn test_four_frames_at_240_fps_is_one_sixtieth() {
        let speed = shutter_speed_for_event(&event(10, 13), 240.0, None, false);
        assert!((speed - 60.0).abs() < 1e-9);
        assert_eq!(format_shutter_speed(speed), "1/60");
    }

    #[test]
    fn test_recording_fps_replaces_fps() {
        let speed = shutter_speed_for_event(&event(0, 7), 30.0, Some(240.0), true);
        assert!((speed - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_duration_seconds_with_slow_motion() {
        assert!((calculate_duration_seconds(0, 29, 30.0, None) - 1.0).abs() < 1e-12);
        assert!((calculate_duration_seconds(0, 29, 30.0, Some(240.0)) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_compare_sign_convention() {
        assert!((compare_with_expected(550.0, 500.0) - 10.0).abs() < 1e-9);
        assert!(compare_with_expected(450.0, 500.0) < 0.0);
    }

    #[test]
    fn test_group_pairs_shortest_with_fastest() {
        let events = vec![event(0, 7), event(20, 21), event(40, 43)];
        let groups = group_shutter_events(&events, &[125.0, 500.0], 1000.0, None);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].expected_speed, 500.0);
        assert_eq!(groups[0].results[0].event.duration_frames(), 2);
        assert_eq!(groups[0].results[0].event.expected_speed_label(), Some("1/500"));
        assert_eq!(groups[1].expected_speed, 125.0);
        assert_eq!(groups[1].results[0].event.duration_frames(), 4);

        let total: usize = groups.iter().map(|g| g.results.len()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_group_merges_duplicate_expected_speeds() {
        let events = vec![event(0, 1), event(10, 11)];
        let groups = group_shutter_events(&events, &[500.0, 500.0], 1000.0, None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].results.len(), 2);
    }

    #[test]
    fn test_format_shutter_speed() {
        assert_eq!(format_shutter_speed(500.0), "1/500");
        assert_eq!(format_shutter_speed(1.0), "1/1");
        assert_eq!(format_shutter_speed(0.5), "2.00s");
        assert_eq!(format_shutter_speed(0.0), "-");
    }

    #[test]
    fn test_format_speed_label() {
        assert_eq!(format_speed_label(250.0), "1/250");
        assert_eq!(format_speed_label(0.5), "2s");
        assert_eq!(format_speed_label(0.4), "2.5s");
    }

    #[test]
    fn test_parse_shutter_speeds() {
        let speeds = parse_shutter_speeds("1/500, 1/250, 2").unwrap();
        assert_eq!(speeds.len(), 3);
        assert!((speeds[0] - 500.0).abs() < 1e-9);
        assert!((speeds[1] - 250.0).abs() < 1e-9);
        assert!((speeds[2] - 0.5).abs() < 1e-9);

        assert_eq!(parse_shutter_speeds(" , 1/60,").unwrap().len(), 1);
        assert!(parse_shutter_speeds("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(matches!(parse_shutter_speeds("1/abc"), Err(CoreError::InvalidSpeed(_))));
        assert!(parse_shutter_speeds("1/0").is_err());
        assert!(parse_shutter_speeds("-2").is_err());
    }
}
