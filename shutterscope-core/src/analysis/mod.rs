// ============================================================================
// shutterscope-core/src/analysis/mod.rs
// ============================================================================
//
// BATCH ANALYSIS: Brightness Statistics, Calibration and Shutter Events
//
// Pure functions over a complete brightness sequence. Data flows one way:
// statistics -> threshold/baseline calibration -> event segmentation ->
// plateau peak estimation -> sub-frame weighted duration -> shutter speed.
//
// KEY COMPONENTS:
// - stats: median, percentile, standard deviation helpers
// - threshold: original and z-score threshold calibration
// - events: segmentation into RawEvent runs and peak estimation
// - speed: speed maths, expected-speed matching, parsing and formatting
//
// Everything here is free of shared state and safe to call concurrently.

pub mod events;
pub mod speed;
pub mod stats;
pub mod threshold;
pub mod types;

pub use events::{
    analyze_and_find_events, calculate_peak_brightness, create_shutter_events,
    find_shutter_events, is_shutter_open,
};
pub use speed::{
    calculate_duration_seconds, calculate_shutter_speed, compare_with_expected,
    format_shutter_speed, format_speed_label, group_shutter_events, measure_events,
    parse_shutter_speeds, shutter_speed_for_event,
};
pub use threshold::{analyze_brightness_distribution, find_threshold_using_zscore};
pub use types::{
    BrightnessStats, RawEvent, ShutterEvent, ShutterSpeedResult, SpeedGroup, ThresholdMethod,
};
