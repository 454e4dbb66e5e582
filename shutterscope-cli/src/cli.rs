// shutterscope-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use shutterscope_core::ThresholdMethod;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Shutterscope: Camera shutter speed measurement",
    long_about = "Measures mechanical shutter speeds from high-frame-rate recordings \
                  or live brightness streams using the shutterscope-core library."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyzes a recorded shutter test video
    Analyze(AnalyzeArgs),
    /// Replays a `brightness,timestamp_nanos` stream through the live detector
    Live(LiveArgs),
    /// Compares the events of a saved results.json with nominal speeds
    Compare(CompareArgs),
}

/// Threshold method as accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodArg {
    Original,
    Zscore,
}

impl From<MethodArg> for ThresholdMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Original => ThresholdMethod::Original,
            MethodArg::Zscore => ThresholdMethod::ZScore,
        }
    }
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Video file recorded while firing the shutter at a light source
    #[arg(required = true, value_name = "VIDEO")]
    pub video: PathBuf,

    /// Threshold method (defaults to SHUTTERSCOPE_METHOD or "original")
    #[arg(short, long, value_enum)]
    pub method: Option<MethodArg>,

    /// Expected number of shutter events (z-score method only)
    #[arg(short, long, value_name = "COUNT")]
    pub events: Option<usize>,

    /// Frame rate the footage was captured at, for slow-motion recordings
    #[arg(long, value_name = "FPS")]
    pub recording_fps: Option<f64>,

    /// Override the container frame rate
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Comma-separated nominal speeds to compare against (e.g. "1/500,1/250,1/125")
    #[arg(long, value_name = "SPEEDS")]
    pub expected: Option<String>,

    /// Base directory for reports; results go to OUTPUT_DIR/<video name>/
    #[arg(short, long, value_name = "OUTPUT_DIR", default_value = "results")]
    pub output_dir: PathBuf,

    /// Print the results as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Skip writing results.md, results.json and the brightness timeline
    #[arg(long, default_value_t = false)]
    pub no_report: bool,

    /// Disable hardware accelerated decoding
    #[arg(long, default_value_t = false)]
    pub no_hw_decode: bool,
}

#[derive(Parser, Debug)]
pub struct LiveArgs {
    /// CSV input with one `brightness,timestamp_nanos` pair per line ("-" reads stdin)
    #[arg(short, long, value_name = "INPUT", default_value = "-")]
    pub input: String,

    /// Camera frame rate; estimated from timestamps when omitted
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Length of the dark baseline window
    #[arg(long, value_name = "SECONDS")]
    pub calibration_seconds: Option<f64>,

    /// Position of the final threshold between baseline and peak (0-1)
    #[arg(long, value_name = "FACTOR")]
    pub threshold_factor: Option<f64>,
}

#[derive(Parser, Debug)]
pub struct CompareArgs {
    /// results.json written by `analyze`
    #[arg(short, long, value_name = "RESULTS")]
    pub results: PathBuf,

    /// Comma-separated nominal speeds (e.g. "1/500,1/250,1/125")
    #[arg(short, long, value_name = "SPEEDS")]
    pub expected: String,

    /// Frame rate the footage was captured at; defaults to the saved value
    #[arg(long, value_name = "FPS")]
    pub recording_fps: Option<f64>,

    /// Print the comparison groups as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
