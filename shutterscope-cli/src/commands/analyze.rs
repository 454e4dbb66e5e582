//! Implementation of the 'analyze' subcommand.
//!
//! Decodes a recorded shutter test, prints the measured speeds (and the
//! comparison with nominal speeds when given) and writes `results.md`,
//! `results.json` and the brightness timeline under the output directory.

use crate::cli::AnalyzeArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::output;

use shutterscope_core::analysis::parse_shutter_speeds;
use shutterscope_core::file_logging::log_analysis_summary;
use shutterscope_core::{
    AnalysisConfig, AnalysisConfigBuilder, AnalysisOptions, AnalysisReport, CoreError,
    ThresholdMethod, analyze_video_file, check_dependency, generate_results_markdown,
    get_output_dir, save_results_json, save_results_markdown, save_timeline_csv,
    save_timeline_plot,
};

use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};

/// Builds the analysis configuration: environment overrides first, then flags.
pub fn create_analysis_config(args: &AnalyzeArgs) -> CliResult<AnalysisConfig> {
    let mut builder = AnalysisConfigBuilder::from_config(AnalysisConfig::from_env());
    if let Some(method) = args.method {
        builder = builder.method(method.into());
    }
    if args.no_hw_decode {
        builder = builder.use_hw_decode(false);
    }
    builder.try_build()
}

/// Maps flags onto per-run options, rejecting combinations the analysis
/// cannot use.
pub fn create_analysis_options(
    args: &AnalyzeArgs,
    config: &AnalysisConfig,
) -> CliResult<AnalysisOptions> {
    let mut options = AnalysisOptions::from_config(config);
    options.expected_events_count = args.events;
    options.fps_override = args.fps;

    if let Some(fps) = args.fps.filter(|fps| *fps <= 0.0 || !fps.is_finite()) {
        return Err(CoreError::Config(format!("--fps must be positive, got {fps}")));
    }
    if let Some(fps) = args.recording_fps.filter(|fps| *fps <= 0.0 || !fps.is_finite()) {
        return Err(CoreError::Config(format!(
            "--recording-fps must be positive, got {fps}"
        )));
    }
    if options.method == ThresholdMethod::ZScore && options.expected_events_count.is_none() {
        warn!("--method zscore needs --events to pick a threshold");
    }
    Ok(options)
}

fn validate_video_path(args: &AnalyzeArgs) -> CliResult<PathBuf> {
    if !args.video.is_file() {
        return Err(CoreError::PathError(format!(
            "Video file not found: {}",
            args.video.display()
        )));
    }
    Ok(args.video.clone())
}

/// Runs the 'analyze' subcommand.
pub fn run_analyze(args: AnalyzeArgs) -> CliResult<()> {
    let start_time = Instant::now();

    let video = validate_video_path(&args)?;
    let config = create_analysis_config(&args)?;
    let options = create_analysis_options(&args, &config)?;
    let expected_speeds = args
        .expected
        .as_deref()
        .map(parse_shutter_speeds)
        .transpose()?
        .filter(|speeds| !speeds.is_empty());

    check_dependency("ffmpeg")?;
    check_dependency("ffprobe")?;

    info!("Analyzing {} ({} method)", video.display(), options.method);
    debug!("Analysis config: {:?}", config);

    let pb = output::create_progress_bar("Decoding");
    let result = analyze_video_file(&video, &config, &options, &mut |fraction| {
        output::set_progress_fraction(&pb, fraction);
    });
    pb.finish_and_clear();

    let analysis = result
        .cli_with_context(|| format!("Failed to analyze {}", video.display()))?
        .cli_with_context(|| format!("No frames could be decoded from {}", video.display()))?;
    log_analysis_summary(&analysis, args.recording_fps);

    let report = AnalysisReport::new(
        &video,
        &analysis,
        args.recording_fps,
        expected_speeds.as_deref(),
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CoreError::JsonParseError(e.to_string()))?;
        println!("{json}");
    } else {
        output::print_section("Shutter speed analysis");
        output::print_status("Video", &report.video);
        output::print_status("Frames", &report.frame_count.to_string());
        output::print_status("Video FPS", &format!("{:.2}", report.fps));
        if let Some(recording_fps) = report.recording_fps {
            output::print_status("Recording FPS", &recording_fps.to_string());
        }
        output::print_status("Baseline", &format!("{:.2}", report.stats.baseline));
        output::print_status("Threshold", &format!("{:.2}", report.stats.threshold));
        output::print_results_table(&report);
        output::print_comparison_table(&report);
    }

    if !args.no_report {
        let output_dir = get_output_dir(&args.output_dir, &video)
            .cli_with_context(|| format!("Failed to create {}", args.output_dir.display()))?;
        let markdown_path = save_results_markdown(&output_dir, &generate_results_markdown(&report))?;
        let json_path = save_results_json(&output_dir, &report)?;
        let timeline_path = save_timeline_csv(&output_dir, &analysis)?;
        let plot_path = save_timeline_plot(&output_dir, &analysis)?;
        if !args.json {
            println!();
            output::print_success(&format!("Report written to {}", markdown_path.display()));
            output::print_status("JSON", &json_path.display().to_string());
            output::print_status("Timeline", &timeline_path.display().to_string());
            output::print_status("Plot", &plot_path.display().to_string());
        }
    }

    info!(
        "Analysis finished in {:.1}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::MethodArg;

    fn args() -> AnalyzeArgs {
        AnalyzeArgs {
            video: PathBuf::from("shutter.mp4"),
            method: None,
            events: None,
            recording_fps: None,
            fps: None,
            expected: None,
            output_dir: PathBuf::from("results"),
            json: false,
            no_report: false,
            no_hw_decode: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut args = args();
        args.method = Some(MethodArg::Zscore);
        args.no_hw_decode = true;
        let config = create_analysis_config(&args).unwrap();
        assert_eq!(config.method, ThresholdMethod::ZScore);
        assert!(!config.decoder.use_hw_decode);
    }

    #[test]
    fn test_options_from_flags() {
        let mut args = args();
        args.events = Some(6);
        args.fps = Some(240.0);
        let config = AnalysisConfig::default();
        let options = create_analysis_options(&args, &config).unwrap();
        assert_eq!(options.expected_events_count, Some(6));
        assert_eq!(options.fps_override, Some(240.0));
        assert_eq!(options.method, ThresholdMethod::Original);
    }

    #[test]
    fn test_non_positive_fps_is_rejected() {
        let mut args = args();
        args.recording_fps = Some(0.0);
        let err = create_analysis_options(&args, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_missing_video() {
        let err = validate_video_path(&args()).unwrap_err();
        assert!(err.to_string().contains("Video file not found"));
    }
}
