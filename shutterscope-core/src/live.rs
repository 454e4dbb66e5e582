// ============================================================================
// shutterscope-core/src/live.rs
// ============================================================================
//
// LIVE DETECTION: Per-Frame Calibration and Event State Machine
//
// Consumes one (brightness, timestamp) pair per camera frame. Calibration has
// two phases: a dark baseline window measured over frame time, followed by a
// single calibration shutter fire whose peak fixes the final threshold. The
// calibration fire is never counted. After that, every crossing above the
// threshold opens an event and the first sample at or below it closes one.
//
// All timing uses the caller's frame timestamps, so a replayed stream behaves
// exactly like the live camera feed it was recorded from.

use serde::{Deserialize, Serialize};

use crate::analysis::{stats, ShutterEvent};
use crate::config::LiveDetectorConfig;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Current phase of the live detector, with the samples it is accumulating.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DetectorState {
    /// Frames are ignored until baseline calibration is started.
    #[default]
    Idle,
    CalibratingBaseline {
        started_at: Option<i64>,
        last_at: Option<i64>,
        samples: Vec<f64>,
    },
    WaitingForCalibrationShutter,
    CapturingCalibrationEvent {
        samples: Vec<f64>,
    },
    WaitingForEvent,
    EventInProgress {
        started_at: i64,
        last_at: i64,
        samples: Vec<f64>,
    },
}

impl DetectorState {
    /// Short human-readable name of the phase.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DetectorState::Idle => "idle",
            DetectorState::CalibratingBaseline { .. } => "calibrating baseline",
            DetectorState::WaitingForCalibrationShutter => "waiting for calibration shutter",
            DetectorState::CapturingCalibrationEvent { .. } => "capturing calibration shutter",
            DetectorState::WaitingForEvent => "waiting for event",
            DetectorState::EventInProgress { .. } => "event in progress",
        }
    }
}

/// A shutter opening observed by the live detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEvent {
    /// Timestamp of the first open sample
    pub start_timestamp: i64,
    /// Timestamp of the last open sample
    pub end_timestamp: i64,
    pub brightness_values: Vec<f64>,
}

impl DetectedEvent {
    /// Number of open frames in the event.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.brightness_values.len()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        (self.end_timestamp - self.start_timestamp) as f64 / NANOS_PER_SECOND
    }

    /// Converts the detection into a [`ShutterEvent`] starting at `start_frame`
    /// so it can be measured at the camera frame rate.
    #[must_use]
    pub fn to_shutter_event(
        &self,
        start_frame: usize,
        baseline: Option<f64>,
        peak: Option<f64>,
    ) -> ShutterEvent {
        let end_frame = start_frame + self.frame_count().saturating_sub(1);
        ShutterEvent::new(start_frame, end_frame, self.brightness_values.clone())
            .with_baseline(baseline)
            .with_peak(peak)
    }
}

/// Notifications emitted by [`LiveEventDetector::process_frame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiveEvent {
    BaselineCalibrationComplete {
        baseline: f64,
        preliminary_threshold: f64,
    },
    CalibrationComplete {
        baseline: f64,
        peak: f64,
        threshold: f64,
    },
    EventDetected(DetectedEvent),
}

/// Two-phase calibrating shutter event detector for live frame streams.
///
/// All timing, including the baseline calibration window, is measured on the
/// `timestamp_nanos` passed to [`process_frame`](Self::process_frame), never on the
/// system clock. Timestamps must be monotonic nanoseconds from one clock, so a
/// recorded stream replays with the same results as the live capture.
///
/// Not internally synchronized; drive it from a single frame callback.
#[derive(Debug, Clone)]
pub struct LiveEventDetector {
    config: LiveDetectorConfig,
    state: DetectorState,
    baseline: Option<f64>,
    preliminary_threshold: Option<f64>,
    threshold: Option<f64>,
    peak_brightness: Option<f64>,
    event_count: usize,
}

impl Default for LiveEventDetector {
    fn default() -> Self {
        Self::new(LiveDetectorConfig::default())
    }
}

impl LiveEventDetector {
    pub fn new(config: LiveDetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            baseline: None,
            preliminary_threshold: None,
            threshold: None,
            peak_brightness: None,
            event_count: 0,
        }
    }

    /// Starts the dark-baseline phase. Only valid from `Idle`; returns whether
    /// the detector moved.
    pub fn start_baseline_calibration(&mut self) -> bool {
        if self.state != DetectorState::Idle {
            log::debug!(
                "Ignoring baseline calibration start while {}",
                self.state.name()
            );
            return false;
        }
        log::info!(
            "Starting baseline calibration ({:.1}s)",
            self.config.calibration_duration_seconds
        );
        self.state = DetectorState::CalibratingBaseline {
            started_at: None,
            last_at: None,
            samples: Vec::new(),
        };
        true
    }

    /// Feeds one frame. Returns the notification produced by this frame, if any.
    pub fn process_frame(&mut self, brightness: f64, timestamp_nanos: i64) -> Option<LiveEvent> {
        let state = std::mem::take(&mut self.state);
        let (next, event) = self.transition(state, brightness, timestamp_nanos);
        self.state = next;
        event
    }

    fn transition(
        &mut self,
        state: DetectorState,
        brightness: f64,
        timestamp: i64,
    ) -> (DetectorState, Option<LiveEvent>) {
        match state {
            DetectorState::Idle => (DetectorState::Idle, None),

            DetectorState::CalibratingBaseline {
                started_at,
                mut samples,
                ..
            } => {
                let started_at = started_at.unwrap_or(timestamp);
                samples.push(brightness);
                let elapsed = (timestamp - started_at) as f64 / NANOS_PER_SECOND;

                if elapsed < self.config.calibration_duration_seconds {
                    return (
                        DetectorState::CalibratingBaseline {
                            started_at: Some(started_at),
                            last_at: Some(timestamp),
                            samples,
                        },
                        None,
                    );
                }

                let baseline = stats::percentile(&samples, 25.0);
                let max_seen = stats::max(&samples);
                let std_dev = stats::std_dev(&samples);
                let preliminary = (baseline + self.config.std_dev_multiplier * std_dev)
                    .max(baseline + self.config.min_brightness_increase)
                    .max(self.config.noise_multiplier * max_seen);

                self.baseline = Some(baseline);
                self.preliminary_threshold = Some(preliminary);
                log::info!(
                    "Baseline calibration complete: baseline={:.2}, preliminary threshold={:.2} ({} samples)",
                    baseline,
                    preliminary,
                    samples.len()
                );

                (
                    DetectorState::WaitingForCalibrationShutter,
                    Some(LiveEvent::BaselineCalibrationComplete {
                        baseline,
                        preliminary_threshold: preliminary,
                    }),
                )
            }

            DetectorState::WaitingForCalibrationShutter => {
                match self.preliminary_threshold {
                    Some(preliminary) if brightness > preliminary => (
                        DetectorState::CapturingCalibrationEvent {
                            samples: vec![brightness],
                        },
                        None,
                    ),
                    _ => (DetectorState::WaitingForCalibrationShutter, None),
                }
            }

            DetectorState::CapturingCalibrationEvent { mut samples } => {
                let preliminary = self.preliminary_threshold.unwrap_or_default();
                if brightness > preliminary {
                    samples.push(brightness);
                    return (DetectorState::CapturingCalibrationEvent { samples }, None);
                }

                let baseline = self.baseline.unwrap_or_default();
                let peak = if samples.is_empty() {
                    preliminary * 2.0
                } else {
                    stats::max(&samples)
                };
                let threshold = baseline + (peak - baseline) * self.config.threshold_factor;

                self.peak_brightness = Some(peak);
                self.threshold = Some(threshold);
                log::info!(
                    "Calibration complete: baseline={:.2}, peak={:.2}, threshold={:.2}",
                    baseline,
                    peak,
                    threshold
                );

                (
                    DetectorState::WaitingForEvent,
                    Some(LiveEvent::CalibrationComplete {
                        baseline,
                        peak,
                        threshold,
                    }),
                )
            }

            DetectorState::WaitingForEvent => match self.threshold {
                Some(threshold) if brightness > threshold => (
                    DetectorState::EventInProgress {
                        started_at: timestamp,
                        last_at: timestamp,
                        samples: vec![brightness],
                    },
                    None,
                ),
                _ => (DetectorState::WaitingForEvent, None),
            },

            DetectorState::EventInProgress {
                started_at,
                last_at,
                mut samples,
            } => {
                let threshold = self.threshold.unwrap_or_default();
                if brightness > threshold {
                    samples.push(brightness);
                    return (
                        DetectorState::EventInProgress {
                            started_at,
                            last_at: timestamp,
                            samples,
                        },
                        None,
                    );
                }

                self.event_count += 1;
                let event = DetectedEvent {
                    start_timestamp: started_at,
                    end_timestamp: last_at,
                    brightness_values: samples,
                };
                log::debug!(
                    "Shutter event #{} detected: {} frame(s)",
                    self.event_count,
                    event.frame_count()
                );
                (
                    DetectorState::WaitingForEvent,
                    Some(LiveEvent::EventDetected(event)),
                )
            }
        }
    }

    /// Calibration progress in `[0, 1]`.
    ///
    /// The baseline window covers the first half; waiting for and capturing
    /// the calibration fire report 0.5 and 0.75.
    #[must_use]
    pub fn calibration_progress(&self) -> f64 {
        match &self.state {
            DetectorState::Idle => 0.0,
            DetectorState::CalibratingBaseline {
                started_at: Some(start),
                last_at: Some(last),
                ..
            } => {
                let elapsed = (last - start) as f64 / NANOS_PER_SECOND;
                (elapsed / self.config.calibration_duration_seconds).clamp(0.0, 0.5)
            }
            DetectorState::CalibratingBaseline { .. } => 0.0,
            DetectorState::WaitingForCalibrationShutter => 0.5,
            DetectorState::CapturingCalibrationEvent { .. } => 0.75,
            DetectorState::WaitingForEvent | DetectorState::EventInProgress { .. } => 1.0,
        }
    }

    /// Returns to `Idle` and forgets all calibration.
    pub fn reset(&mut self) {
        log::debug!("Resetting live detector");
        self.state = DetectorState::Idle;
        self.baseline = None;
        self.preliminary_threshold = None;
        self.threshold = None;
        self.peak_brightness = None;
        self.event_count = 0;
    }

    /// Clears detected events while keeping calibration. A no-op returning
    /// `false` before calibration has completed.
    pub fn reset_events(&mut self) -> bool {
        if !self.is_calibrated() {
            return false;
        }
        self.state = DetectorState::WaitingForEvent;
        self.event_count = 0;
        true
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn config(&self) -> &LiveDetectorConfig {
        &self.config
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn preliminary_threshold(&self) -> Option<f64> {
        self.preliminary_threshold
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn peak_brightness(&self) -> Option<f64> {
        self.peak_brightness
    }

    pub fn detected_event_count(&self) -> usize {
        self.event_count
    }

    pub fn is_calibrated(&self) -> bool {
        self.threshold.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: i64 = 1_000_000_000 / 60;

    /// Feeds `count` frames of `brightness` starting at frame index `*frame`.
    fn feed(
        detector: &mut LiveEventDetector,
        frame: &mut i64,
        brightness: f64,
        count: usize,
    ) -> Vec<LiveEvent> {
        let mut out = Vec::new();
        for _ in 0..count {
            if let Some(event) = detector.process_frame(brightness, *frame * FRAME) {
                out.push(event);
            }
            *frame += 1;
        }
        out
    }

    fn calibrated_detector() -> (LiveEventDetector, i64) {
        let mut detector = LiveEventDetector::default();
        let mut frame = 0;
        detector.start_baseline_calibration();
        feed(&mut detector, &mut frame, 10.0, 302);
        feed(&mut detector, &mut frame, 200.0, 3);
        feed(&mut detector, &mut frame, 10.0, 1);
        assert!(detector.is_calibrated());
        (detector, frame)
    }

    #[test]
    fn test_idle_ignores_frames() {
        let mut detector = LiveEventDetector::default();
        assert_eq!(detector.process_frame(255.0, 0), None);
        assert_eq!(detector.state(), &DetectorState::Idle);
        assert_eq!(detector.calibration_progress(), 0.0);
    }

    #[test]
    fn test_baseline_phase_completes_after_duration() {
        let mut detector = LiveEventDetector::default();
        assert!(detector.start_baseline_calibration());
        assert!(matches!(detector.state(), DetectorState::CalibratingBaseline { .. }));
        assert!(!detector.start_baseline_calibration());

        let mut frame = 0;
        assert!(feed(&mut detector, &mut frame, 10.0, 1).is_empty());
        assert_eq!(detector.calibration_progress(), 0.0);

        // one second into the five second window
        assert!(feed(&mut detector, &mut frame, 10.0, 60).is_empty());
        assert!((detector.calibration_progress() - 0.2).abs() < 1e-6);

        // the 301st frame sits just short of 5s after the first; progress is capped
        assert!(feed(&mut detector, &mut frame, 10.0, 240).is_empty());
        assert_eq!(detector.calibration_progress(), 0.5);

        let events = feed(&mut detector, &mut frame, 10.0, 1);
        assert_eq!(
            events,
            vec![LiveEvent::BaselineCalibrationComplete {
                baseline: 10.0,
                preliminary_threshold: 60.0,
            }]
        );
        assert_eq!(detector.state(), &DetectorState::WaitingForCalibrationShutter);
        assert_eq!(detector.calibration_progress(), 0.5);
    }

    #[test]
    fn test_baseline_window_uses_frame_timestamps() {
        let mut detector = LiveEventDetector::default();
        detector.start_baseline_calibration();

        assert_eq!(detector.process_frame(10.0, 0), None);
        // five seconds of stream time delivered instantly
        let event = detector.process_frame(10.0, 5_000_000_000);
        assert!(matches!(event, Some(LiveEvent::BaselineCalibrationComplete { .. })));
        assert_eq!(detector.state(), &DetectorState::WaitingForCalibrationShutter);
    }

    #[test]
    fn test_calibration_shutter_is_not_counted() {
        let mut detector = LiveEventDetector::default();
        let mut frame = 0;
        detector.start_baseline_calibration();
        feed(&mut detector, &mut frame, 10.0, 302);

        feed(&mut detector, &mut frame, 200.0, 1);
        assert_eq!(detector.calibration_progress(), 0.75);
        feed(&mut detector, &mut frame, 220.0, 2);
        let events = feed(&mut detector, &mut frame, 10.0, 1);

        // threshold = 10 + (220 - 10) * 0.8
        assert_eq!(
            events,
            vec![LiveEvent::CalibrationComplete {
                baseline: 10.0,
                peak: 220.0,
                threshold: 178.0,
            }]
        );
        assert_eq!(detector.detected_event_count(), 0);
        assert_eq!(detector.state(), &DetectorState::WaitingForEvent);
        assert_eq!(detector.calibration_progress(), 1.0);
    }

    #[test]
    fn test_live_events_are_detected_and_counted() {
        let (mut detector, mut frame) = calibrated_detector();
        let start = frame;

        assert!(feed(&mut detector, &mut frame, 190.0, 4).is_empty());
        let events = feed(&mut detector, &mut frame, 10.0, 1);
        assert_eq!(events.len(), 1);
        let LiveEvent::EventDetected(event) = &events[0] else {
            panic!("expected a detected event, got {:?}", events[0]);
        };
        assert_eq!(event.start_timestamp, start * FRAME);
        assert_eq!(event.end_timestamp, (start + 3) * FRAME);
        assert_eq!(event.frame_count(), 4);
        assert_eq!(detector.detected_event_count(), 1);

        let shutter = event.to_shutter_event(100, detector.baseline(), detector.peak_brightness());
        assert_eq!(shutter.duration_frames(), 4);
        assert_eq!(shutter.start_frame(), 100);
        assert_eq!(shutter.baseline_brightness(), Some(10.0));
    }

    #[test]
    fn test_reset_events_keeps_calibration() {
        let (mut detector, mut frame) = calibrated_detector();
        feed(&mut detector, &mut frame, 190.0, 2);
        feed(&mut detector, &mut frame, 10.0, 1);
        assert_eq!(detector.detected_event_count(), 1);

        assert!(detector.reset_events());
        assert_eq!(detector.detected_event_count(), 0);
        assert_eq!(detector.threshold(), Some(162.0));
        assert_eq!(detector.state(), &DetectorState::WaitingForEvent);
    }

    #[test]
    fn test_reset_events_before_calibration_is_noop() {
        let mut detector = LiveEventDetector::default();
        detector.start_baseline_calibration();
        assert!(!detector.reset_events());
        assert!(matches!(detector.state(), DetectorState::CalibratingBaseline { .. }));
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut detector, _) = calibrated_detector();
        detector.reset();
        assert_eq!(detector.state(), &DetectorState::Idle);
        assert_eq!(detector.baseline(), None);
        assert_eq!(detector.threshold(), None);
        assert_eq!(detector.peak_brightness(), None);
        assert!(!detector.is_calibrated());
    }
}
