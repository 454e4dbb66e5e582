// shutterscope-core/tests/live_detector_tests.rs

use shutterscope_core::analysis::shutter_speed_for_event;
use shutterscope_core::{DetectorState, LiveDetectorConfig, LiveEvent, LiveEventDetector};

/// 100 fps keeps frame timestamps exact in nanoseconds.
const FRAME_NANOS: i64 = 10_000_000;

struct Replay {
    detector: LiveEventDetector,
    frame: i64,
}

impl Replay {
    fn new() -> Self {
        Self {
            detector: LiveEventDetector::new(LiveDetectorConfig::default()),
            frame: 0,
        }
    }

    fn feed(&mut self, brightness: f64, count: usize) -> Vec<LiveEvent> {
        let mut emitted = Vec::new();
        for _ in 0..count {
            if let Some(event) = self.detector.process_frame(brightness, self.frame * FRAME_NANOS) {
                emitted.push(event);
            }
            self.frame += 1;
        }
        emitted
    }
}

#[test]
fn test_frames_are_ignored_until_started() {
    let mut replay = Replay::new();
    assert!(replay.feed(255.0, 50).is_empty());
    assert_eq!(replay.detector.state(), &DetectorState::Idle);
    assert_eq!(replay.detector.calibration_progress(), 0.0);
}

#[test]
fn test_full_session() {
    let mut replay = Replay::new();
    assert!(replay.detector.start_baseline_calibration());
    assert!(!replay.detector.start_baseline_calibration());

    // 0.00s .. 4.99s
    assert!(replay.feed(10.0, 500).is_empty());
    assert!(replay.detector.calibration_progress() <= 0.5);

    // 5.00s completes the baseline window
    let emitted = replay.feed(10.0, 1);
    assert_eq!(
        emitted,
        vec![LiveEvent::BaselineCalibrationComplete {
            baseline: 10.0,
            preliminary_threshold: 60.0,
        }]
    );
    assert_eq!(replay.detector.state(), &DetectorState::WaitingForCalibrationShutter);
    assert_eq!(replay.detector.calibration_progress(), 0.5);

    // calibration fire, never counted
    assert!(replay.feed(200.0, 3).is_empty());
    assert_eq!(replay.detector.calibration_progress(), 0.75);
    let emitted = replay.feed(10.0, 1);
    assert_eq!(
        emitted,
        vec![LiveEvent::CalibrationComplete {
            baseline: 10.0,
            peak: 200.0,
            threshold: 162.0,
        }]
    );
    assert_eq!(replay.detector.detected_event_count(), 0);
    assert!(replay.detector.is_calibrated());

    // a real shutter fire of four frames
    replay.feed(10.0, 20);
    let start_frame = replay.frame;
    assert!(replay.feed(190.0, 4).is_empty());
    let emitted = replay.feed(10.0, 1);
    let Some(LiveEvent::EventDetected(detected)) = emitted.first() else {
        panic!("expected a detected event, got {emitted:?}");
    };
    assert_eq!(detected.start_timestamp, start_frame * FRAME_NANOS);
    assert_eq!(detected.end_timestamp, (start_frame + 3) * FRAME_NANOS);
    assert_eq!(detected.frame_count(), 4);
    assert_eq!(replay.detector.detected_event_count(), 1);

    let event = detected.to_shutter_event(
        start_frame as usize,
        replay.detector.baseline(),
        replay.detector.peak_brightness(),
    );
    assert_eq!(event.duration_frames(), 4);
    assert_eq!(shutter_speed_for_event(&event, 100.0, None, false), 25.0);

    assert!(replay.detector.reset_events());
    assert_eq!(replay.detector.detected_event_count(), 0);
    assert_eq!(replay.detector.threshold(), Some(162.0));

    replay.detector.reset();
    assert_eq!(replay.detector.state(), &DetectorState::Idle);
    assert_eq!(replay.detector.baseline(), None);
    assert!(!replay.detector.reset_events());
}
