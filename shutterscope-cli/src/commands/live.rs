//! Implementation of the 'live' subcommand.
//!
//! Replays a recorded brightness stream through the live detector: one
//! `brightness,timestamp_nanos` pair per line, blank lines and `#` comments
//! ignored, an optional header on the first line.

use crate::cli::LiveArgs;
use crate::cli_error;
use crate::error::{CliErrorContext, CliResult};
use crate::output;

use shutterscope_core::analysis::{format_shutter_speed, shutter_speed_for_event};
use shutterscope_core::config::DEFAULT_FALLBACK_FPS;
use shutterscope_core::file_logging::log_live_event;
use shutterscope_core::utils::format_timestamp_nanos;
use shutterscope_core::{
    AnalysisConfig, AnalysisConfigBuilder, DetectedEvent, LiveDetectorConfig, LiveEvent,
    LiveEventDetector,
};

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use log::{debug, info};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Parses one input line. `Ok(None)` for lines that carry no sample.
pub fn parse_sample_line(line: &str, line_number: usize) -> CliResult<Option<(f64, i64)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split(',').map(str::trim);
    let (Some(brightness), Some(timestamp), None) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(cli_error!(
            "line {}: expected 'brightness,timestamp_nanos', got '{}'",
            line_number,
            line
        ));
    };

    match (brightness.parse::<f64>(), timestamp.parse::<i64>()) {
        (Ok(brightness), Ok(timestamp)) => Ok(Some((brightness, timestamp))),
        // Header row
        (Err(_), Err(_)) if line_number == 1 => Ok(None),
        _ => Err(cli_error!("line {}: invalid sample '{}'", line_number, line)),
    }
}

/// Estimates the camera frame rate from the timestamps seen so far.
#[derive(Debug, Default)]
pub struct FrameRateEstimator {
    first: Option<i64>,
    last: Option<i64>,
    frames: u64,
}

impl FrameRateEstimator {
    pub fn record(&mut self, timestamp_nanos: i64) {
        self.first.get_or_insert(timestamp_nanos);
        self.last = Some(timestamp_nanos);
        self.frames += 1;
    }

    /// `None` until two distinct timestamps have been seen.
    pub fn fps(&self) -> Option<f64> {
        let (first, last) = (self.first?, self.last?);
        let elapsed = (last - first) as f64 / NANOS_PER_SECOND;
        (elapsed > 0.0 && self.frames > 1).then(|| (self.frames - 1) as f64 / elapsed)
    }
}

/// A live detector plus the bookkeeping needed to turn detections into
/// shutter speeds.
pub struct LiveSession {
    detector: LiveEventDetector,
    fps_override: Option<f64>,
    estimator: FrameRateEstimator,
    frame_index: usize,
    speeds: Vec<f64>,
}

impl LiveSession {
    pub fn new(config: LiveDetectorConfig, fps_override: Option<f64>) -> Self {
        let mut detector = LiveEventDetector::new(config);
        detector.start_baseline_calibration();
        Self {
            detector,
            fps_override,
            estimator: FrameRateEstimator::default(),
            frame_index: 0,
            speeds: Vec::new(),
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps_override
            .or_else(|| self.estimator.fps())
            .unwrap_or(DEFAULT_FALLBACK_FPS)
    }

    /// Feeds one sample; detected events are measured and returned with
    /// their speed.
    pub fn feed(&mut self, brightness: f64, timestamp_nanos: i64) -> Option<(LiveEvent, Option<f64>)> {
        self.estimator.record(timestamp_nanos);
        let event = self.detector.process_frame(brightness, timestamp_nanos);
        self.frame_index += 1;

        let event = event?;
        let speed = match &event {
            LiveEvent::EventDetected(detected) => {
                let speed = self.measure(detected);
                self.speeds.push(speed);
                Some(speed)
            }
            _ => None,
        };
        Some((event, speed))
    }

    /// Speed of a detection at the session frame rate.
    ///
    /// The closing frame is the current one, so the event started
    /// `frame_count` frames before it.
    pub fn measure(&self, detected: &DetectedEvent) -> f64 {
        let start_frame = self
            .frame_index
            .saturating_sub(detected.frame_count() + 1);
        let event = detected.to_shutter_event(
            start_frame,
            self.detector.baseline(),
            self.detector.peak_brightness(),
        );
        shutter_speed_for_event(&event, self.fps(), None, true)
    }

    pub fn detector(&self) -> &LiveEventDetector {
        &self.detector
    }

    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }
}

fn create_live_config(args: &LiveArgs) -> CliResult<AnalysisConfig> {
    let mut builder = AnalysisConfigBuilder::from_config(AnalysisConfig::from_env());
    if let Some(seconds) = args.calibration_seconds {
        builder = builder.calibration_duration_seconds(seconds);
    }
    if let Some(factor) = args.threshold_factor {
        builder = builder.threshold_factor(factor);
    }
    builder.try_build()
}

fn open_input(input: &str) -> CliResult<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).cli_with_context(|| format!("Failed to open input '{input}'"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn print_live_event(event: &LiveEvent, speed: Option<f64>, event_number: usize) {
    match event {
        LiveEvent::BaselineCalibrationComplete {
            baseline,
            preliminary_threshold,
        } => output::print_success(&format!(
            "Baseline calibration complete: baseline {baseline:.2}, preliminary threshold {preliminary_threshold:.2}"
        )),
        LiveEvent::CalibrationComplete {
            baseline,
            peak,
            threshold,
        } => output::print_success(&format!(
            "Calibration complete: baseline {baseline:.2}, peak {peak:.2}, threshold {threshold:.2}"
        )),
        LiveEvent::EventDetected(detected) => output::print_status(
            &format!("Event {event_number}"),
            &format!(
                "{} at {} ({} frames)",
                speed.map_or_else(|| "-".to_string(), format_shutter_speed),
                format_timestamp_nanos(detected.start_timestamp),
                detected.frame_count()
            ),
        ),
    }
}

/// Runs the 'live' subcommand.
pub fn run_live(args: LiveArgs) -> CliResult<()> {
    if let Some(fps) = args.fps.filter(|fps| *fps <= 0.0 || !fps.is_finite()) {
        return Err(cli_error!("--fps must be positive, got {}", fps));
    }
    let config = create_live_config(&args)?;
    let reader = open_input(&args.input)?;
    let mut session = LiveSession::new(config.live.clone(), args.fps);

    output::print_section("Live detection");
    info!(
        "Calibrating on the first {:.1}s of samples, then waiting for one calibration fire",
        config.live.calibration_duration_seconds
    );

    let mut samples = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line.cli_context("Failed to read input")?;
        let Some((brightness, timestamp)) = parse_sample_line(&line, index + 1)? else {
            continue;
        };
        samples += 1;

        if let Some((event, speed)) = session.feed(brightness, timestamp) {
            log_live_event(&event);
            print_live_event(&event, speed, session.speeds().len());
        }
    }

    debug!("Replayed {} sample(s) at {:.2} fps", samples, session.fps());
    println!();
    if !session.detector().is_calibrated() {
        output::print_warning(&format!(
            "Calibration incomplete after {} sample(s) ({})",
            samples,
            session.detector().state().name()
        ));
        return Ok(());
    }
    output::print_status("Events", &session.speeds().len().to_string());
    output::print_status("FPS", &format!("{:.2}", session.fps()));
    Ok(())
}
