//! Result reports for analyzed videos.
//!
//! Produces the Markdown report (`results.md`), the JSON export
//! (`results.json`) and the brightness timeline (`brightness_timeline.csv`
//! and `.svg`) written next to each other in a per-video output directory,
//! plus the variation color scale both the report and the CLI table use.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::{
    BrightnessStats, ShutterSpeedResult, SpeedGroup, format_shutter_speed, format_speed_label,
    group_shutter_events, measure_events,
};
use crate::error::{CoreError, CoreResult};
use crate::processing::{FrameSource, VideoAnalysis};
use crate::utils::{file_stem_or_default, format_signed_percent};

pub const RESULTS_MARKDOWN_FILE: &str = "results.md";
pub const RESULTS_JSON_FILE: &str = "results.json";
pub const TIMELINE_CSV_FILE: &str = "brightness_timeline.csv";
pub const TIMELINE_SVG_FILE: &str = "brightness_timeline.svg";

const TIMELINE_SIZE: (u32, u32) = (1200, 400);

/// Variation at which the color scale saturates at red.
const VARIATION_CAP_PERCENT: f64 = 25.0;

// ---- Variation scale ----

/// Coarse classification of how far a measurement is from its nominal speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariationBand {
    /// Under 5 %
    Excellent,
    /// Under 10 %
    Good,
    /// Under 15 %
    Fair,
    Poor,
}

#[must_use]
pub fn variation_band(variation_percent: f64) -> VariationBand {
    let variation = variation_percent.abs();
    if variation < 5.0 {
        VariationBand::Excellent
    } else if variation < 10.0 {
        VariationBand::Good
    } else if variation < 15.0 {
        VariationBand::Fair
    } else {
        VariationBand::Poor
    }
}

/// Maps a variation onto a green -> yellow -> red gradient, saturating at 25 %.
#[must_use]
pub fn variation_to_rgb(variation_percent: f64) -> (u8, u8, u8) {
    let ratio = variation_percent.abs().min(VARIATION_CAP_PERCENT) / VARIATION_CAP_PERCENT;
    if ratio < 0.5 {
        ((255.0 * ratio * 2.0) as u8, 255, 0)
    } else {
        (255, (255.0 * (1.0 - (ratio - 0.5) * 2.0)) as u8, 0)
    }
}

#[must_use]
pub fn rgb_to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

// ---- Report model ----

/// Everything written to `results.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub video: String,
    pub generated_at: String,
    pub fps: f64,
    pub recording_fps: Option<f64>,
    pub frame_count: usize,
    pub source: FrameSource,
    pub stats: BrightnessStats,
    pub results: Vec<ShutterSpeedResult>,
    pub comparison: Vec<SpeedGroup>,
}

impl AnalysisReport {
    pub fn new(
        video_path: &Path,
        analysis: &VideoAnalysis,
        recording_fps: Option<f64>,
        expected_speeds: Option<&[f64]>,
    ) -> Self {
        let comparison = expected_speeds
            .map(|speeds| {
                group_shutter_events(&analysis.events, speeds, analysis.fps, recording_fps)
            })
            .unwrap_or_default();

        Self {
            video: display_name(video_path),
            generated_at: Local::now().to_rfc3339(),
            fps: analysis.fps,
            recording_fps,
            frame_count: analysis.frame_count,
            source: analysis.source,
            stats: analysis.stats.clone(),
            results: measure_events(&analysis.events, analysis.fps, recording_fps),
            comparison,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---- Markdown ----

/// Renders the Markdown report: header, detected events table and, when
/// expected speeds were given, the comparison table.
#[must_use]
pub fn generate_results_markdown(report: &AnalysisReport) -> String {
    let mut lines = vec![
        "# Shutter Speed Analysis Results\n".to_string(),
        format!("**Video:** {}", report.video),
        format!("**Date:** {}", Local::now().format("%Y-%m-%d")),
        format!("**Video FPS:** {:.2}", report.fps),
    ];
    if let Some(recording_fps) = report.recording_fps {
        lines.push(format!("**Recording FPS:** {recording_fps}"));
    }

    lines.push(String::new());
    lines.push("## Detected Events\n".to_string());
    lines.push(
        "| Event | Start Frame | End Frame | Duration | Weighted | Measured Speed |".to_string(),
    );
    lines.push(
        "|-------|-------------|-----------|----------|----------|----------------|".to_string(),
    );
    for (i, result) in report.results.iter().enumerate() {
        let event = &result.event;
        lines.push(format!(
            "| {} | {} | {} | {} | {:.2} | {} |",
            i + 1,
            event.start_frame(),
            event.end_frame(),
            event.duration_frames(),
            event.weighted_duration_frames(),
            format_shutter_speed(result.measured_speed)
        ));
    }

    let compared: Vec<&ShutterSpeedResult> = report
        .comparison
        .iter()
        .flat_map(|group| group.results.iter())
        .collect();
    if !compared.is_empty() {
        lines.push(String::new());
        lines.push("## Comparison with Expected\n".to_string());
        lines.push("| Event | Expected | Measured | Variation |".to_string());
        lines.push("|-------|----------|----------|-----------|".to_string());
        for (i, result) in compared.into_iter().enumerate() {
            let variation = result.error_percent.unwrap_or(0.0);
            let expected = result
                .event
                .expected_speed_label()
                .map(str::to_string)
                .or_else(|| result.expected_speed.map(format_speed_label))
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "| {} | {} | {} | <span style=\"color: {}\">{}</span> |",
                i + 1,
                expected,
                format_shutter_speed(result.measured_speed),
                rgb_to_hex(variation_to_rgb(variation)),
                format_signed_percent(variation)
            ));
        }
    }

    lines.join("\n")
}

// ---- Output files ----

/// Returns `<base_dir>/<video stem>/`, creating it when missing.
pub fn get_output_dir(base_dir: &Path, video_path: &Path) -> CoreResult<PathBuf> {
    let output_dir = base_dir.join(file_stem_or_default(video_path));
    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

pub fn save_results_markdown(output_dir: &Path, content: &str) -> CoreResult<PathBuf> {
    let path = output_dir.join(RESULTS_MARKDOWN_FILE);
    fs::write(&path, content)?;
    log::info!("Wrote report to {}", path.display());
    Ok(path)
}

pub fn save_results_json(output_dir: &Path, report: &AnalysisReport) -> CoreResult<PathBuf> {
    let path = output_dir.join(RESULTS_JSON_FILE);
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| CoreError::JsonParseError(format!("results serialization: {e}")))?;
    fs::write(&path, json)?;
    log::info!("Wrote JSON results to {}", path.display());
    Ok(path)
}

// ---- Brightness timeline ----

/// One analyzed frame as exported to the timeline CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub frame: usize,
    pub time_s: f64,
    pub brightness: f64,
    pub threshold: f64,
    pub in_event: bool,
}

/// Per-frame brightness with the threshold and event membership.
#[must_use]
pub fn brightness_timeline(analysis: &VideoAnalysis) -> Vec<TimelineRow> {
    let mut in_event = vec![false; analysis.brightness_values.len()];
    for event in &analysis.events {
        let end = (event.end_frame() + 1).min(in_event.len());
        if let Some(span) = in_event.get_mut(event.start_frame()..end) {
            span.fill(true);
        }
    }

    analysis
        .brightness_values
        .iter()
        .zip(in_event)
        .enumerate()
        .map(|(frame, (&brightness, in_event))| TimelineRow {
            frame,
            time_s: frame as f64 / analysis.fps,
            brightness,
            threshold: analysis.stats.threshold,
            in_event,
        })
        .collect()
}

fn export_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Export(e.to_string())
}

pub fn save_timeline_csv(output_dir: &Path, analysis: &VideoAnalysis) -> CoreResult<PathBuf> {
    let path = output_dir.join(TIMELINE_CSV_FILE);
    let mut writer = csv::Writer::from_path(&path).map_err(export_error)?;
    for row in brightness_timeline(analysis) {
        writer.serialize(row).map_err(export_error)?;
    }
    writer.flush()?;
    log::info!("Wrote brightness timeline to {}", path.display());
    Ok(path)
}

/// Plots brightness over time with the threshold as a horizontal line and
/// each event shaded across its frames.
pub fn save_timeline_plot(output_dir: &Path, analysis: &VideoAnalysis) -> CoreResult<PathBuf> {
    let path = output_dir.join(TIMELINE_SVG_FILE);
    let threshold = analysis.stats.threshold;
    let end_s = analysis.brightness_values.len().max(1) as f64 / analysis.fps;
    let y_max = analysis
        .brightness_values
        .iter()
        .copied()
        .fold(threshold, f64::max)
        .max(1.0)
        * 1.05;

    {
        let root = SVGBackend::new(&path, TIMELINE_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(export_error)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0.0..end_s, 0.0..y_max)
            .map_err(export_error)?;

        chart
            .draw_series(analysis.events.iter().map(|event| {
                let start = event.start_frame() as f64 / analysis.fps;
                let end = (event.end_frame() + 1) as f64 / analysis.fps;
                Rectangle::new([(start, 0.0), (end, y_max)], GREEN.mix(0.2).filled())
            }))
            .map_err(export_error)?;
        chart
            .draw_series(LineSeries::new(
                analysis
                    .brightness_values
                    .iter()
                    .enumerate()
                    .map(|(frame, &value)| (frame as f64 / analysis.fps, value)),
                &BLUE,
            ))
            .map_err(export_error)?;
        chart
            .draw_series(LineSeries::new([(0.0, threshold), (end_s, threshold)], &RED))
            .map_err(export_error)?;

        root.present().map_err(export_error)?;
    }
    log::info!("Wrote brightness plot to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ShutterEvent;

    fn analysis() -> VideoAnalysis {
        let stats = BrightnessStats {
            baseline: 20.0,
            threshold: 50.0,
            ..BrightnessStats::default()
        };
        VideoAnalysis {
            events: vec![
                ShutterEvent::new(10, 13, vec![200.0; 4]),
                ShutterEvent::new(40, 47, vec![200.0; 8]),
            ],
            stats,
            frame_count: 100,
            fps: 240.0,
            source: FrameSource::Sequential,
            brightness_values: Vec::new(),
        }
    }

    #[test]
    fn test_variation_scale() {
        assert_eq!(variation_to_rgb(0.0), (0, 255, 0));
        assert_eq!(variation_to_rgb(-12.5), (255, 255, 0));
        assert_eq!(variation_to_rgb(40.0), (255, 0, 0));
        assert_eq!(rgb_to_hex((255, 128, 0)), "#ff8000");

        assert_eq!(variation_band(4.9), VariationBand::Excellent);
        assert_eq!(variation_band(-7.0), VariationBand::Good);
        assert_eq!(variation_band(14.0), VariationBand::Fair);
        assert_eq!(variation_band(15.0), VariationBand::Poor);
    }

    #[test]
    fn test_markdown_without_expected_speeds() {
        let report = AnalysisReport::new(Path::new("/tmp/shots/leica.mp4"), &analysis(), None, None);
        let markdown = generate_results_markdown(&report);

        assert!(markdown.starts_with("# Shutter Speed Analysis Results"));
        assert!(markdown.contains("**Video:** leica.mp4"));
        assert!(markdown.contains("**Video FPS:** 240.00"));
        assert!(!markdown.contains("Recording FPS"));
        assert!(markdown.contains("| 1 | 10 | 13 | 4 | 4.00 | 1/60 |"));
        assert!(markdown.contains("| 2 | 40 | 47 | 8 | 8.00 | 1/30 |"));
        assert!(!markdown.contains("Comparison with Expected"));
    }

    #[test]
    fn test_markdown_comparison_pairs_shortest_with_fastest() {
        let report = AnalysisReport::new(
            Path::new("leica.mp4"),
            &analysis(),
            None,
            Some(&[30.0, 60.0][..]),
        );
        let markdown = generate_results_markdown(&report);

        assert!(markdown.contains("## Comparison with Expected"));
        assert!(markdown.contains("| 1 | 1/60 | 1/60 | <span style=\"color: #00ff00\">0.0%</span> |"));
        assert!(markdown.contains("| 2 | 1/30 | 1/30 |"));
    }

    #[test]
    fn test_output_files() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = get_output_dir(dir.path(), Path::new("/videos/fm2.mov")).unwrap();
        assert_eq!(output_dir, dir.path().join("fm2"));
        assert!(output_dir.is_dir());

        let md = save_results_markdown(&output_dir, "# report").unwrap();
        assert_eq!(fs::read_to_string(md).unwrap(), "# report");

        let report = AnalysisReport::new(Path::new("fm2.mov"), &analysis(), Some(1000.0), None);
        let json = save_results_json(&output_dir, &report).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
        assert_eq!(value["frame_count"], 100);
        assert_eq!(value["source"], "sequential");
        assert_eq!(value["results"].as_array().map(Vec::len), Some(2));
    }

    fn timeline_analysis() -> VideoAnalysis {
        let mut values = vec![20.0; 8];
        values[2..5].fill(200.0);
        VideoAnalysis {
            events: vec![ShutterEvent::new(2, 4, vec![200.0; 3])],
            stats: BrightnessStats {
                baseline: 20.0,
                threshold: 60.0,
                ..BrightnessStats::default()
            },
            frame_count: values.len(),
            fps: 4.0,
            source: FrameSource::Sequential,
            brightness_values: values,
        }
    }

    #[test]
    fn test_timeline_marks_event_frames() {
        let rows = brightness_timeline(&timeline_analysis());
        assert_eq!(rows.len(), 8);
        assert_eq!(
            rows[2],
            TimelineRow {
                frame: 2,
                time_s: 0.5,
                brightness: 200.0,
                threshold: 60.0,
                in_event: true,
            }
        );
        let flagged: Vec<usize> = rows.iter().filter(|r| r.in_event).map(|r| r.frame).collect();
        assert_eq!(flagged, vec![2, 3, 4]);
        assert!(rows.iter().all(|r| r.threshold == 60.0));
    }

    #[test]
    fn test_timeline_files() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = timeline_analysis();

        let csv_path = save_timeline_csv(dir.path(), &analysis).unwrap();
        let csv = fs::read_to_string(csv_path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "frame,time_s,brightness,threshold,in_event");
        assert_eq!(lines[1], "0,0.0,20.0,60.0,false");
        assert_eq!(lines[4], "3,0.75,200.0,60.0,true");
        assert_eq!(lines.len(), 9);

        let svg_path = save_timeline_plot(dir.path(), &analysis).unwrap();
        assert_eq!(svg_path, dir.path().join(TIMELINE_SVG_FILE));
        let svg = fs::read_to_string(svg_path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polyline"));
    }
}
