//! Plain-text session logs.
//!
//! `setup_file_logging` installs a log4rs file logger; the `log_*` helpers
//! write analysis milestones in a stable, grep-friendly form so a log file
//! alone is enough to reconstruct what was measured.

pub mod setup;

pub use setup::setup_file_logging;

use log::{debug, info};

use crate::analysis::{format_shutter_speed, shutter_speed_for_event};
use crate::live::LiveEvent;
use crate::processing::VideoAnalysis;
use crate::utils::format_timestamp_nanos;

/// Logs the calibration figures and every event of a finished analysis.
pub fn log_analysis_summary(analysis: &VideoAnalysis, recording_fps: Option<f64>) {
    let stats = &analysis.stats;
    info!(
        "Analyzed {} frame(s) at {:.2} fps via {:?} decoding",
        analysis.frame_count, analysis.fps, analysis.source
    );
    info!(
        "Brightness: min {:.1}, max {:.1}, mean {:.1}, median {:.1}",
        stats.min, stats.max, stats.mean, stats.median
    );
    info!(
        "Calibration: baseline {:.2}, threshold {:.2}, peak {}",
        stats.baseline,
        stats.threshold,
        stats
            .peak_brightness
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.2}"))
    );

    for (i, event) in analysis.events.iter().enumerate() {
        let speed = shutter_speed_for_event(event, analysis.fps, recording_fps, true);
        info!(
            "Event {}: frames {}-{} ({} frames, {:.2} weighted) -> {}",
            i + 1,
            event.start_frame(),
            event.end_frame(),
            event.duration_frames(),
            event.weighted_duration_frames(),
            format_shutter_speed(speed)
        );
    }
    if analysis.events.is_empty() {
        info!("No shutter events detected");
    }
}

/// Logs a milestone emitted by the live detector.
pub fn log_live_event(event: &LiveEvent) {
    match event {
        LiveEvent::BaselineCalibrationComplete {
            baseline,
            preliminary_threshold,
        } => info!(
            "Baseline calibration complete: baseline {:.2}, preliminary threshold {:.2}",
            baseline, preliminary_threshold
        ),
        LiveEvent::CalibrationComplete {
            baseline,
            peak,
            threshold,
        } => info!(
            "Calibration complete: baseline {:.2}, peak {:.2}, threshold {:.2}",
            baseline, peak, threshold
        ),
        LiveEvent::EventDetected(detected) => {
            info!(
                "Shutter event at {} lasting {} frame(s)",
                format_timestamp_nanos(detected.start_timestamp),
                detected.frame_count()
            );
            debug!("Event brightness samples: {:?}", detected.brightness_values);
        }
    }
}
