//! Data types shared by the batch analysis pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::stats;
use crate::error::CoreError;

/// How the open/closed brightness threshold is derived from a sample sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// `baseline + (median - baseline) * margin_factor`
    #[default]
    Original,
    /// Z-score search that best reproduces an expected open-sample count
    ZScore,
}

impl fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdMethod::Original => write!(f, "original"),
            ThresholdMethod::ZScore => write!(f, "zscore"),
        }
    }
}

impl FromStr for ThresholdMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(ThresholdMethod::Original),
            "zscore" | "z-score" => Ok(ThresholdMethod::ZScore),
            other => Err(CoreError::Config(format!(
                "unknown threshold method '{other}' (expected 'original' or 'zscore')"
            ))),
        }
    }
}

/// A contiguous, inclusive run of samples strictly above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub start_frame: usize,
    pub end_frame: usize,
    pub brightness_values: Vec<f64>,
}

impl RawEvent {
    #[must_use]
    pub fn duration_frames(&self) -> usize {
        self.end_frame - self.start_frame + 1
    }
}

/// Summary statistics and calibration of one brightness sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrightnessStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Percentiles at 10, 25, 75 and 90
    pub percentiles: BTreeMap<u32, f64>,
    pub baseline: f64,
    pub threshold: f64,
    /// Plateau-based "fully open" level, filled in after segmentation
    pub peak_brightness: Option<f64>,
}

/// One shutter opening, with the calibration context needed to weight it.
///
/// Events are built once and never mutated; the `with_*` methods consume the
/// value and return a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutterEvent {
    start_frame: usize,
    end_frame: usize,
    brightness_values: Vec<f64>,
    baseline_brightness: Option<f64>,
    peak_brightness: Option<f64>,
    expected_speed_label: Option<String>,
}

impl ShutterEvent {
    /// Creates an event covering `start_frame..=end_frame`. An inverted range
    /// is collapsed to a single frame at `start_frame`.
    #[must_use]
    pub fn new(start_frame: usize, end_frame: usize, brightness_values: Vec<f64>) -> Self {
        Self {
            start_frame,
            end_frame: end_frame.max(start_frame),
            brightness_values,
            baseline_brightness: None,
            peak_brightness: None,
            expected_speed_label: None,
        }
    }

    #[must_use]
    pub fn with_baseline(mut self, baseline: Option<f64>) -> Self {
        self.baseline_brightness = baseline;
        self
    }

    #[must_use]
    pub fn with_peak(mut self, peak: Option<f64>) -> Self {
        self.peak_brightness = peak;
        self
    }

    #[must_use]
    pub fn with_expected_speed_label(mut self, label: impl Into<String>) -> Self {
        self.expected_speed_label = Some(label.into());
        self
    }

    pub fn start_frame(&self) -> usize {
        self.start_frame
    }

    pub fn end_frame(&self) -> usize {
        self.end_frame
    }

    pub fn brightness_values(&self) -> &[f64] {
        &self.brightness_values
    }

    pub fn baseline_brightness(&self) -> Option<f64> {
        self.baseline_brightness
    }

    pub fn peak_brightness(&self) -> Option<f64> {
        self.peak_brightness
    }

    pub fn expected_speed_label(&self) -> Option<&str> {
        self.expected_speed_label.as_deref()
    }

    /// Number of frames the shutter was open: `end - start + 1`.
    #[must_use]
    pub fn duration_frames(&self) -> usize {
        self.end_frame - self.start_frame + 1
    }

    /// Sub-frame duration where partially open frames count proportionally.
    ///
    /// Each sample contributes `clamp((b - baseline) / (peak - baseline), 0, 1)`
    /// where the peak is the median of this event's own samples, its plateau
    /// level. The sequence-wide `peak_brightness` is not used here: a short
    /// event rarely reaches the plateau of longer ones. Without a baseline,
    /// without samples, or when the median does not exceed the baseline, the
    /// plain `duration_frames` is returned.
    #[must_use]
    pub fn weighted_duration_frames(&self) -> f64 {
        let fallback = self.duration_frames() as f64;
        let Some(baseline) = self.baseline_brightness else {
            return fallback;
        };
        if self.brightness_values.is_empty() {
            return fallback;
        }

        let peak = stats::median(&self.brightness_values);
        if peak <= baseline {
            return fallback;
        }

        let range = peak - baseline;
        self.brightness_values
            .iter()
            .map(|b| ((b - baseline) / range).clamp(0.0, 1.0))
            .sum()
    }

    /// Brightest sample, `0.0` without samples.
    #[must_use]
    pub fn max_brightness(&self) -> f64 {
        stats::max(&self.brightness_values)
    }

    /// Mean sample, `0.0` without samples.
    #[must_use]
    pub fn avg_brightness(&self) -> f64 {
        stats::mean(&self.brightness_values)
    }
}

impl From<RawEvent> for ShutterEvent {
    fn from(raw: RawEvent) -> Self {
        ShutterEvent::new(raw.start_frame, raw.end_frame, raw.brightness_values)
    }
}

/// A measured event, optionally paired with the speed it was expected to be.
///
/// Speeds use the `1/x` convention: `500.0` means 1/500 s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutterSpeedResult {
    pub event: ShutterEvent,
    pub measured_speed: f64,
    pub expected_speed: Option<f64>,
    /// `(measured - expected) / expected * 100`; positive means faster than expected
    pub error_percent: Option<f64>,
}

/// All results matched to one expected speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedGroup {
    pub expected_speed: f64,
    pub results: Vec<ShutterSpeedResult>,
}
