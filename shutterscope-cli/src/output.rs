//! Terminal output for the `shutterscope` commands.
//!
//! Results go to stdout so they can be piped; progress bars draw on stderr
//! and stay hidden when stderr is not a terminal.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;

use shutterscope_core::analysis::{format_shutter_speed, format_speed_label};
use shutterscope_core::reporting::{VariationBand, variation_band};
use shutterscope_core::utils::format_signed_percent;
use shutterscope_core::{AnalysisReport, ShutterSpeedResult};

/// Check if color should be used (respects NO_COLOR environment variable)
fn should_use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Print a section header
pub fn print_section(title: &str) {
    println!();
    if should_use_color() {
        println!("===== {} =====", title.to_uppercase().cyan().bold());
    } else {
        println!("===== {} =====", title.to_uppercase());
    }
}

/// Print a label/value line with the label padded to a fixed width
pub fn print_status(label: &str, value: &str) {
    let padding = 15usize.saturating_sub(label.len()).max(1);
    println!("  {}:{}{}", label, " ".repeat(padding), value);
}

pub fn print_success(message: &str) {
    if should_use_color() {
        println!("  ✓ {}", message.green());
    } else {
        println!("  ✓ {}", message);
    }
}

pub fn print_warning(message: &str) {
    if should_use_color() {
        println!("  ! {}", message.yellow());
    } else {
        println!("  ! {}", message);
    }
}

fn colorize_variation(text: &str, variation_percent: f64) -> String {
    if !should_use_color() {
        return text.to_string();
    }
    match variation_band(variation_percent) {
        VariationBand::Excellent => text.green().to_string(),
        VariationBand::Good => text.bright_green().to_string(),
        VariationBand::Fair => text.yellow().to_string(),
        VariationBand::Poor => text.red().to_string(),
    }
}

/// Prints the detected events table of a report.
pub fn print_results_table(report: &AnalysisReport) {
    print_section("Detected events");
    if report.results.is_empty() {
        print_warning("No shutter events detected");
        return;
    }

    println!(
        "  {:>5}  {:>7}  {:>7}  {:>8}  {:>8}  {:>10}",
        "Event", "Start", "End", "Frames", "Weighted", "Speed"
    );
    for (i, result) in report.results.iter().enumerate() {
        let event = &result.event;
        println!(
            "  {:>5}  {:>7}  {:>7}  {:>8}  {:>8.2}  {:>10}",
            i + 1,
            event.start_frame(),
            event.end_frame(),
            event.duration_frames(),
            event.weighted_duration_frames(),
            format_shutter_speed(result.measured_speed)
        );
    }
}

/// Prints measured vs. expected speeds with the variation colored by band.
pub fn print_comparison_table(report: &AnalysisReport) {
    let compared: Vec<&ShutterSpeedResult> = report
        .comparison
        .iter()
        .flat_map(|group| group.results.iter())
        .collect();
    if compared.is_empty() {
        return;
    }

    print_section("Comparison with expected");
    println!(
        "  {:>5}  {:>10}  {:>10}  {:>9}",
        "Event", "Expected", "Measured", "Variation"
    );
    for (i, result) in compared.into_iter().enumerate() {
        let variation = result.error_percent.unwrap_or(0.0);
        let expected = result
            .expected_speed
            .map_or_else(|| "-".to_string(), format_speed_label);
        let variation_text = format!("{:>9}", format_signed_percent(variation));
        println!(
            "  {:>5}  {:>10}  {:>10}  {}",
            i + 1,
            expected,
            format_shutter_speed(result.measured_speed),
            colorize_variation(&variation_text, variation)
        );
    }
}

/// Progress bar for video decoding, driven by fractions in `[0, 1]`.
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(1000);
    let style = ProgressStyle::default_bar()
        .template("{msg}: {percent:>3}% [{bar:30}] ({elapsed_precise})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##.");
    pb.set_style(style);
    pb.set_message(message.to_string());

    if !std::io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb
}

/// Moves `pb` to `fraction` of its length.
pub fn set_progress_fraction(pb: &ProgressBar, fraction: f32) {
    let length = pb.length().unwrap_or(1000);
    pb.set_position((f64::from(fraction.clamp(0.0, 1.0)) * length as f64) as u64);
}
