//! Implementation of the 'compare' subcommand.
//!
//! Re-pairs the events of a saved `results.json` with a new list of nominal
//! speeds without decoding the video again.

use crate::cli::CompareArgs;
use crate::cli_error;
use crate::error::{CliErrorContext, CliResult};
use crate::output;

use shutterscope_core::analysis::{group_shutter_events, measure_events, parse_shutter_speeds};
use shutterscope_core::{AnalysisReport, CoreError, ShutterEvent};

use std::fs;

use log::{debug, info};

/// Recomputes the measured speeds and the comparison groups of `report`.
///
/// `recording_fps` replaces the report's own value when given.
pub fn compare_report(report: &mut AnalysisReport, expected_speeds: &[f64], recording_fps: Option<f64>) {
    let recording_fps = recording_fps.or(report.recording_fps);
    let events: Vec<ShutterEvent> = report.results.iter().map(|r| r.event.clone()).collect();

    report.recording_fps = recording_fps;
    report.results = measure_events(&events, report.fps, recording_fps);
    report.comparison = group_shutter_events(&events, expected_speeds, report.fps, recording_fps);
}

pub fn run_compare(args: CompareArgs) -> CliResult<()> {
    let expected_speeds = parse_shutter_speeds(&args.expected)?;
    if expected_speeds.is_empty() {
        return Err(cli_error!("No expected speeds given"));
    }

    let content = fs::read_to_string(&args.results)
        .cli_with_context(|| format!("Failed to read {}", args.results.display()))?;
    let mut report: AnalysisReport = serde_json::from_str(&content).map_err(|e| {
        CoreError::JsonParseError(format!("{}: {}", args.results.display(), e))
    })?;
    debug!(
        "Loaded {} event(s) from {}",
        report.results.len(),
        args.results.display()
    );

    compare_report(&mut report, &expected_speeds, args.recording_fps);
    info!(
        "Compared {} event(s) against {} expected speed(s)",
        report.results.len(),
        expected_speeds.len()
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report.comparison)
            .map_err(|e| CoreError::JsonParseError(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    output::print_section("Shutter speed comparison");
    output::print_status("Video", &report.video);
    output::print_status("Video FPS", &format!("{:.2}", report.fps));
    if let Some(recording_fps) = report.recording_fps {
        output::print_status("Recording FPS", &recording_fps.to_string());
    }
    output::print_results_table(&report);
    if report.comparison.is_empty() {
        output::print_warning("No events to compare");
    } else {
        output::print_comparison_table(&report);
    }
    Ok(())
}
